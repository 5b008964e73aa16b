//! Outbound request construction
//!
//! Builds the [`ForwardEnvelope`] for one inbound request: target URL, headers
//! and (possibly rewritten) body.

use axum::http::HeaderMap;
use bytes::Bytes;
use serde_json::Value;

use crate::routing::{Provider, ResolvedTarget};

use super::headers::build_outbound_headers;

/// Everything needed to make the outbound call, built once per request
#[derive(Debug, Clone)]
pub struct ForwardEnvelope {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Provider that drives retry and stream filtering; `None` for pass-through
    pub provider: Option<Provider>,
}

/// Assemble the envelope for an inbound request
///
/// `parsed` is the inbound body parsed as JSON, when that succeeded. The
/// path and query are appended verbatim to the resolved (or default) base URL.
pub fn build_envelope(
    default_upstream: &str,
    path_and_query: &str,
    inbound_headers: &HeaderMap,
    body: Bytes,
    parsed: Option<Value>,
    target: Option<&ResolvedTarget>,
) -> ForwardEnvelope {
    let base = target
        .map(|t| t.base_url.as_str())
        .unwrap_or(default_upstream)
        .trim_end_matches('/');

    let body = match target.and_then(|t| t.model.as_deref()) {
        Some(model) => rewrite_model(body, parsed, model),
        None => body,
    };

    ForwardEnvelope {
        url: format!("{}{}", base, path_and_query),
        headers: build_outbound_headers(
            inbound_headers,
            target.and_then(|t| t.credential.as_ref()),
        ),
        body,
        provider: target.map(|t| t.provider),
    }
}

/// Replace the `model` field of a JSON object body
///
/// Bodies that are not JSON objects, or that have no `model` field, are
/// returned untouched.
pub fn rewrite_model(original: Bytes, parsed: Option<Value>, model: &str) -> Bytes {
    let Some(Value::Object(mut object)) = parsed else {
        return original;
    };

    match object.get_mut("model") {
        Some(slot) => *slot = Value::String(model.to_string()),
        None => return original,
    }

    match serde_json::to_vec(&object) {
        Ok(rewritten) => Bytes::from(rewritten),
        Err(_) => original,
    }
}
