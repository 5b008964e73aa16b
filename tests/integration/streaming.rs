//! Streaming relay integration tests
//!
//! Only the provider known to emit empty content blocks has its stream
//! filtered; everyone else is relayed byte for byte.

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{cliproxyapi_settings, constants, events, glm_settings, router_with_settings};

#[tokio::test]
async fn test_cliproxyapi_stream_drops_empty_blocks() {
    let backend = MockServer::start().await;
    let stream = format!(
        "{}{}{}{}{}",
        events::MESSAGE_START,
        events::EMPTY_TEXT_BLOCK,
        events::TEXT_DELTA,
        events::EMPTY_TOOL_BLOCK,
        events::MESSAGE_STOP
    );
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(stream.into_bytes(), "text/event-stream"))
        .expect(1)
        .mount(&backend)
        .await;

    let port = backend.address().port();
    let router = router_with_settings("http://127.0.0.1:1", cliproxyapi_settings(port));

    let response = router
        .server
        .post("/v1/messages")
        .json(&json!({"model": constants::MAIN_MODEL, "stream": true}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/event-stream");
    assert_eq!(
        response.text(),
        format!(
            "{}{}{}",
            events::MESSAGE_START,
            events::TEXT_DELTA,
            events::MESSAGE_STOP
        )
    );
}

#[tokio::test]
async fn test_other_provider_stream_is_verbatim() {
    let glm = MockServer::start().await;
    let stream = format!("{}{}", events::EMPTY_TEXT_BLOCK, events::TEXT_DELTA);
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(stream.clone().into_bytes(), "text/event-stream"),
        )
        .mount(&glm)
        .await;

    let router = router_with_settings("http://127.0.0.1:1", glm_settings(&glm.uri(), "glm:glm-4-air"));
    let response = router
        .server
        .post("/v1/messages")
        .json(&json!({"model": constants::HAIKU_MODEL, "stream": true}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), stream);
}

#[tokio::test]
async fn test_missing_content_type_defaults_to_json() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(br#"{"id":"msg_1"}"#.to_vec()))
        .mount(&upstream)
        .await;

    let router = router_with_settings(&upstream.uri(), Default::default());
    let response = router
        .server
        .post("/v1/messages")
        .json(&json!({"model": constants::MAIN_MODEL}))
        .await;

    assert_eq!(response.header("content-type"), "application/json");
    assert_eq!(response.text(), r#"{"id":"msg_1"}"#);
}
