//! Request logging utilities for provider proxying
//!
//! Provides structured logging with correlation IDs for tracing a request
//! through classification, forwarding, retry and relay.

use std::time::Instant;
use tracing::{debug, error, info, warn, Span};
use uuid::Uuid;

use crate::routing::ModelClass;

/// Provider label used for pass-through requests
pub const PASS_THROUGH: &str = "passthrough";

/// Context for tracking a request through the system
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (for log correlation)
    pub trace_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Provider handling this request, or [`PASS_THROUGH`]
    pub provider: String,
    /// Inbound path and query
    pub endpoint: String,
    /// Model class the request was classified into
    pub model_class: ModelClass,
    /// Model named by the client
    pub model: Option<String>,
    /// Model sent upstream after mapping
    pub target_model: Option<String>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(endpoint: &str, model_class: ModelClass) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(), // Short ID for readability
            start_time: Instant::now(),
            provider: PASS_THROUGH.to_string(),
            endpoint: endpoint.to_string(),
            model_class,
            model: None,
            target_model: None,
        }
    }

    /// Set the client's model for this request
    pub fn with_model(mut self, model: Option<impl Into<String>>) -> Self {
        self.model = model.map(Into::into);
        self
    }

    /// Record the provider and upstream model chosen by the resolver
    pub fn with_target(mut self, provider: &str, target_model: Option<&str>) -> Self {
        self.provider = provider.to_string();
        self.target_model = target_model.map(str::to_string);
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Get elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Log request initiation
    pub fn log_request_start(&self) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model_class = %self.model_class,
            model = ?self.model,
            target_model = ?self.target_model,
            "Request started"
        );
    }

    /// Log request being sent to upstream
    pub fn log_upstream_request(&self, url: &str, body_size: usize, attempt: u32) {
        debug!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            url = %url,
            body_size = %body_size,
            attempt = %attempt,
            elapsed_ms = %self.elapsed_ms(),
            "Sending request to upstream"
        );
    }

    /// Log response received from upstream
    pub fn log_upstream_response(&self, status: u16, content_length: Option<u64>) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            status = %status,
            content_length = ?content_length,
            elapsed_ms = %self.elapsed_ms(),
            "Response received from upstream"
        );
    }

    /// Log stream ended
    pub fn log_stream_ended(&self, chunks: usize, dropped_chunks: usize) {
        info!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            chunks = %chunks,
            dropped_chunks = %dropped_chunks,
            elapsed_ms = %self.elapsed_ms(),
            "Response relay ended"
        );
    }

    /// Log the caller going away before the relay finished
    pub fn log_client_disconnected(&self, chunks: usize) {
        debug!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            chunks = %chunks,
            elapsed_ms = %self.elapsed_ms(),
            "Client disconnected before relay completed"
        );
    }

    /// Log request failure
    pub fn log_error(&self, error: &str) {
        error!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model_class = %self.model_class,
            model = ?self.model,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Request failed"
        );
    }

    /// Log connection error (specific for debugging connectivity issues)
    pub fn log_connection_error(&self, error: &str, url: &str, attempt: u32) {
        error!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            url = %url,
            attempt = %attempt,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Connection to upstream failed"
        );
    }

    /// Log retry attempt
    pub fn log_retry(&self, attempt: u32, reason: &str) {
        warn!(
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            attempt = %attempt,
            reason = %reason,
            elapsed_ms = %self.elapsed_ms(),
            "Retrying request"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "proxy_request",
            trace_id = %self.trace_id,
            provider = %self.provider,
            endpoint = %self.endpoint,
            model_class = %self.model_class,
        )
    }
}
