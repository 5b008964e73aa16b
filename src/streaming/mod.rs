//! Event-stream normalization
//!
//! Some providers open content blocks they never fill: a `tool_use` block
//! with an empty `input` object, or a `text` block with an empty string.
//! Clients that render blocks as they start show these as blank entries, so
//! the relay strips them from those providers' streams.
//!
//! The filter works on one network chunk at a time and keeps no state
//! between chunks. An event whose lines straddle two chunks is passed
//! through unfiltered.

use bytes::Bytes;
use serde_json::Value;

/// Event name whose empty instances are removed
const CONTENT_BLOCK_START: &str = "content_block_start";

/// Result of filtering one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredChunk {
    pub bytes: Bytes,
    /// Number of events removed from the chunk
    pub dropped_events: usize,
}

impl FilteredChunk {
    fn unchanged(bytes: &Bytes) -> Self {
        Self {
            bytes: bytes.clone(),
            dropped_events: 0,
        }
    }
}

/// Remove empty `content_block_start` events from one event-stream chunk
///
/// Lines are kept byte-for-byte, line terminators included. A removed event
/// takes its `event:` line, any lines up to its `data:` line, the `data:`
/// line itself and the blank line that terminates it. Chunks that are not
/// UTF-8, and `data:` payloads that do not parse, are never altered.
pub fn strip_empty_content_blocks(chunk: &Bytes) -> FilteredChunk {
    let Ok(text) = std::str::from_utf8(chunk) else {
        return FilteredChunk::unchanged(chunk);
    };
    if !text.contains(CONTENT_BLOCK_START) {
        return FilteredChunk::unchanged(chunk);
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut current_event: Option<&str> = None;
    // Index in `kept` where the current event's `event:` line sits
    let mut event_start: Option<usize> = None;
    let mut swallowing_terminator = false;
    let mut dropped_events = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if swallowing_terminator {
            swallowing_terminator = false;
            if content.is_empty() {
                continue;
            }
        }

        if let Some(name) = content.strip_prefix("event:") {
            current_event = Some(name.trim());
            event_start = Some(kept.len());
            kept.push(line);
            continue;
        }

        if let Some(payload) = content.strip_prefix("data:") {
            if current_event == Some(CONTENT_BLOCK_START) && is_empty_content_block(payload) {
                if let Some(start) = event_start {
                    kept.truncate(start);
                }
                current_event = None;
                event_start = None;
                swallowing_terminator = true;
                dropped_events += 1;
                continue;
            }
            kept.push(line);
            continue;
        }

        if content.is_empty() {
            current_event = None;
            event_start = None;
        }
        kept.push(line);
    }

    if dropped_events == 0 {
        return FilteredChunk::unchanged(chunk);
    }

    FilteredChunk {
        bytes: Bytes::from(kept.concat()),
        dropped_events,
    }
}

/// Whether a `data:` payload describes a content block that carries nothing
fn is_empty_content_block(payload: &str) -> bool {
    let Ok(event) = serde_json::from_str::<Value>(payload.trim()) else {
        return false;
    };
    let Some(block) = event.get("content_block") else {
        return false;
    };

    match block.get("type").and_then(Value::as_str) {
        Some("tool_use") => block
            .get("input")
            .and_then(Value::as_object)
            .is_some_and(|input| input.is_empty()),
        Some("text") => block.get("text").and_then(Value::as_str) == Some(""),
        _ => false,
    }
}
