//! Event-Stream Framing
//!
//! Produces the text blocks written to SSE channels:
//!
//! ```text
//! event: alert
//! data: {"camera_id":"cam-1","confidence":0.93}
//!
//! ```
//!
//! Comment blocks (lines starting with `:`) keep a connection warm without
//! being dispatched as events by browser `EventSource` readers.

use serde::Serialize;
use thiserror::Error;

/// Errors produced while framing an event
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Event name must be non-empty and single-line: {0:?}")]
    InvalidEventName(String),

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Frame a named event with a JSON payload.
///
/// `serde_json` escapes control characters, so the data line never spans
/// more than one line.
pub fn event<T: Serialize + ?Sized>(name: &str, payload: &T) -> Result<String, FrameError> {
    if name.is_empty() || name.contains(['\n', '\r']) {
        return Err(FrameError::InvalidEventName(name.to_string()));
    }

    let data = serde_json::to_string(payload)?;
    Ok(format!("event: {}\ndata: {}\n\n", name, data))
}

/// Frame a comment block. Multi-line text becomes one comment line per line.
pub fn comment(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for line in text.lines() {
        out.push_str(": ");
        out.push_str(line);
        out.push('\n');
    }
    if out.is_empty() {
        out.push_str(":\n");
    }
    out.push('\n');
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Minimal event-stream reader: returns (event, data) for the first
    /// dispatchable block, skipping comment-only blocks.
    pub(crate) fn parse_first(text: &str) -> Option<(String, Value)> {
        for block in text.split("\n\n") {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if line.starts_with(':') {
                    continue;
                }
                if let Some(v) = line.strip_prefix("event: ") {
                    event = Some(v.to_string());
                } else if let Some(v) = line.strip_prefix("data: ") {
                    data = Some(serde_json::from_str(v).ok()?);
                }
            }
            if let Some(data) = data {
                return Some((event.unwrap_or_else(|| "message".to_string()), data));
            }
        }
        None
    }

    #[test]
    fn test_event_layout() {
        let framed = event("alert", &json!({"x": 1})).unwrap();
        assert_eq!(framed, "event: alert\ndata: {\"x\":1}\n\n");
    }

    #[test]
    fn test_event_round_trip() {
        let framed = event("alert", &json!({"a": 1, "b": "x"})).unwrap();
        let (name, data) = parse_first(&framed).unwrap();
        assert_eq!(name, "alert");
        assert_eq!(data, json!({"a": 1, "b": "x"}));
    }

    #[test]
    fn test_payload_newlines_stay_on_one_line() {
        let framed = event("alert", &json!({"note": "line one\nline two"})).unwrap();
        assert_eq!(framed.matches('\n').count(), 3);
        let (_, data) = parse_first(&framed).unwrap();
        assert_eq!(data["note"], "line one\nline two");
    }

    #[test]
    fn test_invalid_event_names() {
        assert!(matches!(
            event("", &1),
            Err(FrameError::InvalidEventName(_))
        ));
        assert!(matches!(
            event("alert\ndata: spoofed", &1),
            Err(FrameError::InvalidEventName(_))
        ));
    }

    #[test]
    fn test_comment_is_not_an_event() {
        let framed = comment("connected");
        assert_eq!(framed, ": connected\n\n");
        assert!(parse_first(&framed).is_none());
    }

    #[test]
    fn test_multiline_comment() {
        assert_eq!(comment("a\nb"), ": a\n: b\n\n");
        assert_eq!(comment(""), ":\n\n");
    }
}
