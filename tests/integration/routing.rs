//! Routing integration tests
//!
//! - a mapped class reaches its provider with the model rewritten and the
//!   provider credential in place of the caller's
//! - `pass` and unusable mappings reach the default upstream untouched
//! - upstream error statuses are relayed as-is
//! - settings file edits apply to the next request

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use model_router::routing::{RouterSettings, SettingsStore};
use model_router::ProcessRegistry;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{constants, glm_settings, router_with, router_with_settings};

fn x_api_key(value: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_static(value),
    )
}

#[tokio::test]
async fn test_haiku_request_routed_to_glm_with_rewrite() {
    let default_upstream = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&default_upstream)
        .await;

    let glm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", constants::GLM_API_KEY))
        .and(body_json(json!({
            "model": "glm-4-air",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_glm",
            "type": "message",
            "content": [{"type": "text", "text": "hello"}]
        })))
        .expect(1)
        .mount(&glm)
        .await;

    let router = router_with_settings(
        &default_upstream.uri(),
        glm_settings(&glm.uri(), "glm:glm-4-air"),
    );

    let (name, value) = x_api_key(constants::CLIENT_API_KEY);
    let response = router
        .server
        .post("/v1/messages")
        .add_header(name, value)
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer client-token"),
        )
        .json(&json!({
            "model": constants::HAIKU_MODEL,
            "max_tokens": 64,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], "msg_glm");

    let received = glm.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
    assert_eq!(received[0].headers.get_all("x-api-key").iter().count(), 1);
}

#[tokio::test]
async fn test_rewrite_preserves_field_order() {
    let glm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&glm)
        .await;

    let router = router_with_settings("http://127.0.0.1:1", glm_settings(&glm.uri(), "glm:glm-4-air"));

    router
        .server
        .post("/v1/messages")
        .text(r#"{"stream":true,"model":"claude-3-5-haiku-latest","max_tokens":8}"#)
        .await
        .assert_status_ok();

    let received = glm.received_requests().await.unwrap();
    assert_eq!(
        String::from_utf8(received[0].body.clone()).unwrap(),
        r#"{"stream":true,"model":"glm-4-air","max_tokens":8}"#
    );
}

#[tokio::test]
async fn test_pass_mapping_forwards_unchanged() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", constants::CLIENT_API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_default"})))
        .expect(1)
        .mount(&upstream)
        .await;

    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    let raw = r#"{"model":"claude-sonnet-4-5-20250929",  "messages":[]}"#;
    let (name, value) = x_api_key(constants::CLIENT_API_KEY);
    let response = router
        .server
        .post("/v1/messages")
        .add_header(name, value)
        .text(raw)
        .await;

    response.assert_status_ok();
    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received[0].body, raw.as_bytes());
}

#[tokio::test]
async fn test_disabled_provider_falls_back_to_default_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-api-key", constants::CLIENT_API_KEY))
        .and(body_json(json!({"model": constants::HAIKU_MODEL})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let glm = MockServer::start().await;
    let mut settings = glm_settings(&glm.uri(), "glm:glm-4-air");
    settings.providers.glm.enabled = false;

    let router = router_with_settings(&upstream.uri(), settings);
    let (name, value) = x_api_key(constants::CLIENT_API_KEY);
    router
        .server
        .post("/v1/messages")
        .add_header(name, value)
        .json(&json!({"model": constants::HAIKU_MODEL}))
        .await
        .assert_status_ok();

    assert!(glm.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_model_part_keeps_inbound_model() {
    let glm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-api-key", constants::GLM_API_KEY))
        .and(body_json(json!({"model": constants::HAIKU_MODEL})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&glm)
        .await;

    let router = router_with_settings("http://127.0.0.1:1", glm_settings(&glm.uri(), "glm:"));
    router
        .server
        .post("/v1/messages")
        .json(&json!({"model": constants::HAIKU_MODEL}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_upstream_error_status_relayed() {
    let glm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "slow down"}
        })))
        .expect(1)
        .mount(&glm)
        .await;

    let router = router_with_settings("http://127.0.0.1:1", glm_settings(&glm.uri(), "glm:glm-4-air"));
    let response = router
        .server
        .post("/v1/messages")
        .json(&json!({"model": constants::HAIKU_MODEL}))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "rate_limit_error");
}

#[tokio::test]
async fn test_settings_file_changes_apply_to_next_request() {
    let default_upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "default"})))
        .mount(&default_upstream)
        .await;

    let glm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "glm"})))
        .mount(&glm)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let settings_path = scratch.path().join("model-router.json");
    std::fs::write(&settings_path, r#"{"mappings":{"haiku":"pass"}}"#).unwrap();

    let store = SettingsStore::from_file(settings_path.clone()).await;
    let router = router_with(&default_upstream.uri(), scratch, store, ProcessRegistry::new());

    let request = json!({"model": constants::HAIKU_MODEL});
    let body: Value = router.server.post("/v1/messages").json(&request).await.json();
    assert_eq!(body["from"], "default");

    // Let the modification time move past the previous stamp
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let updated = glm_settings(&glm.uri(), "glm:glm-4-air");
    std::fs::write(&settings_path, serde_json::to_vec(&updated).unwrap()).unwrap();

    let body: Value = router.server.post("/v1/messages").json(&request).await.json();
    assert_eq!(body["from"], "glm");
}
