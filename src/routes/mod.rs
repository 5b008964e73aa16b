//! HTTP routes for the router
//!
//! Two administrative endpoints under `/_router`; every other path is proxied.

pub mod health;
pub mod metrics;
pub mod proxy;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route(
            "/_router/health",
            get(health::health_check).fallback(proxy::method_not_allowed),
        )
        .route(
            "/_router/metrics",
            get(metrics::prometheus_metrics).fallback(proxy::method_not_allowed),
        );

    Router::new()
        .merge(admin_routes)
        .fallback(proxy::proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
