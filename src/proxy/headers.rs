//! Header utilities for provider proxying
//!
//! Inbound headers are forwarded as-is except for transport-local ones, and
//! inbound credentials are swapped for the provider credential when the
//! resolved target carries one.

use axum::http::header::{self, HeaderName};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::routing::resolver::{Credential, X_API_KEY};

/// Request headers that describe the inbound connection, not the request
const TRANSPORT_LOCAL_HEADERS: &[HeaderName] = &[
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
];

/// Response headers that frame the upstream connection and must be recomputed
const RESPONSE_FRAMING_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
];

/// Content type assumed when the upstream does not send one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Build headers for the outbound request
///
/// With a credential, inbound `x-api-key` and `authorization` are dropped and
/// the credential is inserted under its own header. Without one, inbound
/// auth headers pass through untouched.
pub fn build_outbound_headers(inbound: &HeaderMap, credential: Option<&Credential>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());

    for (name, value) in inbound {
        if TRANSPORT_LOCAL_HEADERS.contains(name) {
            continue;
        }
        if credential.is_some() && (*name == X_API_KEY || *name == AUTHORIZATION) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(credential) = credential {
        headers.insert(
            credential.header_name().clone(),
            credential.header_value().clone(),
        );
    }

    headers
}

/// Check if a header frames the upstream response and must not be relayed
pub fn is_framing_header(name: &HeaderName) -> bool {
    RESPONSE_FRAMING_HEADERS.contains(&name.as_str())
}

/// Filter framing headers from an upstream response
///
/// The result always carries a content type.
pub fn filter_response_headers(response_headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(response_headers.len());

    for (name, value) in response_headers {
        if !is_framing_header(name) {
            filtered.append(name.clone(), value.clone());
        }
    }

    if !filtered.contains_key(CONTENT_TYPE) {
        filtered.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }

    filtered
}
