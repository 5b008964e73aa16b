//! Health check endpoint
//!
//! `/_router/health` reports uptime, version and the state of every
//! supervised provider process.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::routing::Provider;
use crate::supervisor::LaunchSpec;
use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// A supervised provider the router should be running is down
    Degraded,
}

/// State of one supervised provider
#[derive(Debug, Serialize)]
pub struct ProcessCheck {
    pub provider: Provider,
    pub enabled: bool,
    /// Whether the router launches this provider itself
    pub managed: bool,
    pub running: bool,
    pub restarts: u64,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub audit_logging: bool,
    pub processes: Vec<ProcessCheck>,
}

/// Health check endpoint
///
/// Always answers 200; a managed provider that is enabled but not running
/// marks the router degraded.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let settings = state.settings.snapshot().await;

    let processes: Vec<ProcessCheck> = state
        .processes
        .status()
        .await
        .into_iter()
        .map(|status| ProcessCheck {
            provider: status.provider,
            enabled: status.provider.settings(&settings.providers).enabled,
            managed: LaunchSpec::from_settings(status.provider, &settings).is_some(),
            running: status.running,
            restarts: status.restarts,
        })
        .collect();

    let status = if processes
        .iter()
        .any(|p| p.enabled && p.managed && !p.running)
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        audit_logging: settings.audit_logging,
        processes,
    })
}
