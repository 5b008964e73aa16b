//! Front door integration tests
//!
//! - non-POST requests are refused with a JSON 405
//! - `/_router/health` and `/_router/metrics` are served locally
//! - path and query reach the upstream verbatim

use axum::http::StatusCode;
use model_router::routing::RouterSettings;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{constants, router_with_settings};

#[tokio::test]
async fn test_non_post_is_rejected_without_forwarding() {
    let upstream = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    let response = router.server.get("/v1/messages").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");

    let response = router.server.put("/v1/messages").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);

    let response = router.server.delete("/anything/else").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_admin_routes_only_accept_get() {
    let upstream = MockServer::start().await;
    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    let response = router.server.post("/_router/health").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_health_reports_supervised_processes() {
    let upstream = MockServer::start().await;
    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    let response = router.server.get("/_router/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["audit_logging"], false);

    let processes = body["processes"].as_array().unwrap();
    let providers: Vec<&str> = processes
        .iter()
        .map(|p| p["provider"].as_str().unwrap())
        .collect();
    assert_eq!(providers, ["cliproxyapi", "copilot"]);
    assert!(processes.iter().all(|p| p["running"] == false));
}

#[tokio::test]
async fn test_health_degraded_when_managed_provider_down() {
    let upstream = MockServer::start().await;
    let mut settings = RouterSettings::default();
    settings.providers.copilot.enabled = true;
    settings.providers.copilot.binary_path = Some("/opt/copilot-api".into());

    let router = router_with_settings(&upstream.uri(), settings);
    let body: Value = router.server.get("/_router/health").await.json();
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let upstream = MockServer::start().await;
    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    router.server.get("/_router/metrics").await.assert_status_ok();
}

#[tokio::test]
async fn test_path_and_query_forwarded_verbatim() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/count_tokens"))
        .and(query_param("beta", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"input_tokens": 12})))
        .expect(1)
        .mount(&upstream)
        .await;

    let router = router_with_settings(&upstream.uri(), RouterSettings::default());

    let response = router
        .server
        .post("/v1/messages/count_tokens")
        .add_query_param("beta", "true")
        .json(&json!({"model": constants::MAIN_MODEL, "messages": []}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({"input_tokens": 12}));

    let received = upstream.received_requests().await.unwrap();
    assert_eq!(received[0].url.path(), "/v1/messages/count_tokens");
    assert_eq!(received[0].url.query(), Some("beta=true"));
}
