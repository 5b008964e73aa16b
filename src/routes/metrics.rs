//! Prometheus metrics endpoint
//!
//! Exposes router metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "router_requests_total",
        "Proxied requests by provider and upstream status"
    );
    metrics::describe_histogram!(
        "router_request_duration_seconds",
        "Time until upstream response headers, in seconds"
    );
    metrics::describe_counter!(
        "router_upstream_retries_total",
        "Retries after a transport failure against a supervised provider"
    );
    metrics::describe_counter!(
        "router_process_restarts_total",
        "Restarts of supervised provider processes"
    );
    metrics::describe_counter!(
        "router_audit_failures_total",
        "Audit records that could not be written"
    );
    metrics::describe_counter!(
        "router_filtered_events_total",
        "Empty content block events removed from provider streams"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a proxied request once its upstream status is known
///
/// Transport failures are recorded with status 0.
pub fn record_request(provider: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "router_requests_total",
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("router_request_duration_seconds", "provider" => provider.to_string())
        .record(duration_secs);
}

/// Record a retry against a supervised provider
pub fn record_retry(provider: &str) {
    metrics::counter!("router_upstream_retries_total", "provider" => provider.to_string())
        .increment(1);
}

/// Record a supervised process restart
pub fn record_process_restart(provider: &str) {
    metrics::counter!("router_process_restarts_total", "provider" => provider.to_string())
        .increment(1);
}

/// Record an audit write failure
pub fn record_audit_failure() {
    metrics::counter!("router_audit_failures_total").increment(1);
}

/// Record events removed by the stream filter
pub fn record_filtered_events(provider: &str, count: u64) {
    metrics::counter!("router_filtered_events_total", "provider" => provider.to_string())
        .increment(count);
}
