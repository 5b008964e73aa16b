//! Request audit records
//!
//! When auditing is enabled every proxied exchange is written to its own JSON
//! file. Files are created once and never touched again; external tooling
//! reads them.
//!
//! Writing is best-effort. [`AuditSink::record`] reports failures through its
//! `Result`, and callers log and discard them so a full disk never breaks a
//! proxied request.

use std::path::{Path, PathBuf};

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::routes::metrics::record_audit_failure;
use crate::routing::{ModelClass, Provider};

/// Terminal token of an event stream, not a JSON payload
const DONE_MARKER: &str = "[DONE]";

/// Header values never written to disk
const REDACTED_HEADERS: &[&str] = &["x-api-key", "authorization"];

/// Audit errors
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The mapping decision that produced a request, for later correlation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInfo {
    pub original_model: Option<String>,
    pub resolved_model: Option<String>,
    pub target_url: String,
    pub provider: Provider,
    pub model_class: ModelClass,
}

/// What was sent upstream
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub url: String,
    pub method: String,
    pub headers: Map<String, Value>,
    /// Post-transformation body: JSON when it parses, text otherwise
    pub body: Value,
    /// `null` for pass-through
    pub mapping: Option<MappingInfo>,
}

impl RequestSnapshot {
    pub fn new(
        url: &str,
        method: &str,
        headers: &HeaderMap,
        body: &[u8],
        mapping: Option<MappingInfo>,
    ) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            headers: headers_to_json(headers),
            body: serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
            mapping,
        }
    }
}

/// What came back
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Map<String, Value>,
    pub body: Value,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: &HeaderMap, body: &[u8]) -> Self {
        Self {
            status,
            headers: headers_to_json(headers),
            body: parse_response_body(body),
        }
    }
}

/// One audit file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub request: RequestSnapshot,
    pub response: Option<ResponseSnapshot>,
    pub error: Option<String>,
}

/// Writes audit records into a directory
#[derive(Debug, Clone)]
pub struct AuditSink {
    dir: PathBuf,
}

impl AuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one record and return its path
    pub async fn record(
        &self,
        request: RequestSnapshot,
        response: Option<ResponseSnapshot>,
        error: Option<String>,
    ) -> Result<PathBuf, AuditError> {
        let timestamp = Utc::now();
        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            timestamp,
            request,
            response,
            error,
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name(timestamp));
        let contents = serde_json::to_vec_pretty(&record)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&contents).await?;
        file.flush().await?;

        debug!(path = %path.display(), id = %record.id, "Audit record written");
        Ok(path)
    }
}

/// A request snapshot waiting for its outcome
///
/// Built when auditing is enabled for a request, then submitted once the
/// response finished relaying or the send failed.
#[derive(Debug)]
pub struct PendingAudit {
    sink: AuditSink,
    request: RequestSnapshot,
}

impl PendingAudit {
    pub fn new(sink: AuditSink, request: RequestSnapshot) -> Self {
        Self { sink, request }
    }

    /// Write the record; failures are logged and counted, never returned
    pub async fn submit(self, response: Option<ResponseSnapshot>, error: Option<String>) {
        if let Err(e) = self.sink.record(self.request, response, error).await {
            debug!(dir = %self.sink.dir.display(), error = %e, "Failed to write audit record");
            record_audit_failure();
        }
    }
}

/// Sortable file name: timestamp plus a short random disambiguator
fn file_name(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}-{:06x}.json",
        timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
        rand::random::<u32>() & 0x00ff_ffff
    )
}

/// Header map as a JSON object, credentials redacted
pub fn headers_to_json(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for name in headers.keys() {
        let value = if REDACTED_HEADERS.contains(&name.as_str()) {
            "[redacted]".to_string()
        } else {
            headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        };
        map.insert(name.as_str().to_string(), Value::String(value));
    }
    map
}

/// Interpret an accumulated response body for the audit record
///
/// A single JSON document is stored as-is. Otherwise the body is scanned for
/// `data: ` lines; if any of them parse, the record holds
/// `{isStreaming, chunks, rawText}`. Anything else is stored as text.
pub fn parse_response_body(body: &[u8]) -> Value {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return value;
    }

    let text = String::from_utf8_lossy(body).into_owned();
    let chunks: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter(|payload| payload.trim() != DONE_MARKER)
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect();

    if chunks.is_empty() {
        Value::String(text)
    } else {
        json!({
            "isStreaming": true,
            "chunks": chunks,
            "rawText": text,
        })
    }
}
