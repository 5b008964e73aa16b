//! Outbound send with a single restart-and-retry for supervised providers
//!
//! A transport failure (no status line received) against a supervised
//! provider usually means its local process died or wedged. The forwarder
//! restarts it through the [`ProcessRegistry`], waits for it to settle and
//! tries once more. HTTP error statuses are never retried.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::routes::metrics::record_retry;
use crate::routing::RouterSettings;
use crate::supervisor::{LaunchSpec, ProcessRegistry};

use super::logging::RequestContext;
use super::transform::ForwardEnvelope;

/// The outbound call never produced a response
#[derive(Debug, Error)]
#[error("{source}")]
pub struct TransportError {
    /// Attempts made, including the retry
    pub attempts: u32,
    #[source]
    pub source: reqwest::Error,
}

/// Sends envelopes upstream
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    processes: Arc<ProcessRegistry>,
    settle: Duration,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, processes: Arc<ProcessRegistry>, settle: Duration) -> Self {
        Self {
            client,
            processes,
            settle,
        }
    }

    /// POST the envelope, retrying once after a restart when the provider is supervised
    pub async fn send(
        &self,
        envelope: &ForwardEnvelope,
        settings: &RouterSettings,
        ctx: &RequestContext,
    ) -> Result<reqwest::Response, TransportError> {
        let supervised = envelope.provider.filter(|p| p.is_supervised());
        // Read before the attempt so a restart finished meanwhile is recognized
        let observed = supervised.map(|p| self.processes.generation(p));

        let first = match self.attempt(envelope, ctx, 1).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let (Some(provider), Some(observed)) = (supervised, observed) else {
            return Err(TransportError {
                attempts: 1,
                source: first,
            });
        };

        ctx.log_retry(2, &first.to_string());
        record_retry(provider.name());

        let launch = LaunchSpec::from_settings(provider, settings);
        match self
            .processes
            .restart_if_stale(provider, observed, launch.as_ref())
            .await
        {
            Ok(true) => info!(trace_id = %ctx.trace_id, provider = %provider, "Supervised provider restarted"),
            Ok(false) => debug!(
                trace_id = %ctx.trace_id,
                provider = %provider,
                "Supervised provider already restarted by a concurrent request"
            ),
            Err(e) => warn!(
                trace_id = %ctx.trace_id,
                provider = %provider,
                error = %e,
                "Restart failed, retrying anyway"
            ),
        }

        tokio::time::sleep(self.settle).await;

        self.attempt(envelope, ctx, 2)
            .await
            .map_err(|source| TransportError {
                attempts: 2,
                source,
            })
    }

    async fn attempt(
        &self,
        envelope: &ForwardEnvelope,
        ctx: &RequestContext,
        attempt: u32,
    ) -> Result<reqwest::Response, reqwest::Error> {
        ctx.log_upstream_request(&envelope.url, envelope.body.len(), attempt);

        self.client
            .post(&envelope.url)
            .headers(envelope.headers.clone())
            .body(envelope.body.clone())
            .send()
            .await
            .map_err(|e| {
                ctx.log_connection_error(&e.to_string(), &envelope.url, attempt);
                e
            })
    }
}

/// HTTP client for outbound calls
///
/// Only connecting is bounded; streamed responses may run as long as the
/// backend keeps sending. Redirects are relayed to the caller, not followed,
/// and bodies are never decompressed.
pub fn build_client(connect_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(100)
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
