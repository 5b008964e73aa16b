//! Upstream response relay
//!
//! Turns the upstream response into the inbound response without buffering:
//! status and headers are copied at once, and body chunks are forwarded as
//! they arrive. Providers that emit empty content blocks get their chunks
//! filtered on the way through. When auditing is on, the raw upstream bytes
//! are captured and written out once the body ends.

use axum::body::Body;
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::warn;

use crate::audit::{PendingAudit, ResponseSnapshot};
use crate::routes::metrics::{record_filtered_events, record_request};
use crate::routing::Provider;
use crate::streaming::strip_empty_content_blocks;

use super::headers::filter_response_headers;
use super::logging::RequestContext;

/// Logs a disconnect if the body stream is dropped before it finished
struct RelayGuard {
    ctx: RequestContext,
    chunks: usize,
    finished: bool,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.ctx.log_client_disconnected(self.chunks);
        }
    }
}

/// Build the inbound response for an upstream response
pub fn relay_response(
    upstream: reqwest::Response,
    ctx: RequestContext,
    provider: Option<Provider>,
    audit: Option<PendingAudit>,
) -> Response {
    let status = upstream.status();
    let upstream_headers: HeaderMap = upstream.headers().clone();

    ctx.log_upstream_response(status.as_u16(), upstream.content_length());
    record_request(&ctx.provider, status.as_u16(), ctx.elapsed_secs());

    let filter = provider.filter(|p| p.normalizes_events());
    let mut body = upstream.bytes_stream();
    let headers = filter_response_headers(&upstream_headers);

    let stream = async_stream::stream! {
        let mut guard = RelayGuard { ctx, chunks: 0, finished: false };
        let mut captured = audit.as_ref().map(|_| BytesMut::new());
        let mut dropped_chunks = 0;
        let mut failure: Option<String> = None;

        while let Some(item) = body.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(
                        trace_id = %guard.ctx.trace_id,
                        provider = %guard.ctx.provider,
                        error = %e,
                        "Upstream stream failed mid-response"
                    );
                    failure = Some(e.to_string());
                    break;
                }
            };

            guard.chunks += 1;
            if let Some(buffer) = captured.as_mut() {
                buffer.extend_from_slice(&chunk);
            }

            let outbound: Bytes = match filter {
                Some(provider) => {
                    let filtered = strip_empty_content_blocks(&chunk);
                    if filtered.dropped_events > 0 {
                        record_filtered_events(provider.name(), filtered.dropped_events as u64);
                    }
                    filtered.bytes
                }
                None => chunk,
            };

            if outbound.is_empty() {
                dropped_chunks += 1;
                continue;
            }
            yield Ok::<Bytes, std::io::Error>(outbound);
        }

        guard.finished = true;
        match &failure {
            Some(error) => guard.ctx.log_error(error),
            None => guard.ctx.log_stream_ended(guard.chunks, dropped_chunks),
        }

        if let Some(pending) = audit {
            let raw = captured.unwrap_or_default();
            let response = ResponseSnapshot::new(status.as_u16(), &upstream_headers, &raw);
            pending.submit(Some(response), failure.clone()).await;
        }

        if let Some(error) = failure {
            yield Err(std::io::Error::other(error));
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
