//! Write-ahead log record type and its line-oriented JSON encoding.
//!
//! Each record is a single self-describing JSON object, one per line.
//! Fields that don't apply to a given `Op` are omitted from the encoded
//! line rather than emitted with a placeholder value. The payload is
//! base64-framed so that arbitrary bytes, including embedded quotes and
//! newlines, never need their own escaping on top of what `serde_json`
//! already does for the rest of the record.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// The four state transitions a message can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// A message was appended to the ready queue.
    Publish,
    /// A message was handed to a consumer.
    Consume,
    /// A delivery was acknowledged.
    Ack,
    /// A delivery was rejected (explicitly or by visibility timeout).
    Nack,
}

/// One write-ahead log record. Required fields vary by `op`:
/// `Publish` needs `msg_id` + `payload`; `Consume` needs `msg_id` +
/// `handle` + `retry_count`; `Ack`/`Nack` need only `handle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Which transition this record represents.
    pub op: Op,
    /// Message identity, present for `Publish` and `Consume`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub msg_id: Option<String>,
    /// Base64-encoded payload bytes, present only for `Publish`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<String>,
    /// Receipt handle, present for `Consume`, `Ack`, and `Nack`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub handle: Option<String>,
    /// Retry count at the time of this record, present for `Consume`.
    #[serde(skip_serializing_if = "is_zero", default)]
    pub retry_count: u32,
    /// Wall-clock time the record was written, informational only.
    pub timestamp_ms: i64,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl LogEntry {
    /// Builds a `Publish` record.
    pub fn publish(msg_id: &str, payload: &[u8], retry_count: u32, timestamp_ms: i64) -> Self {
        Self {
            op: Op::Publish,
            msg_id: Some(msg_id.to_string()),
            payload: Some(BASE64.encode(payload)),
            handle: None,
            retry_count,
            timestamp_ms,
        }
    }

    /// Builds a `Consume` record.
    pub fn consume(msg_id: &str, handle: &str, retry_count: u32, timestamp_ms: i64) -> Self {
        Self {
            op: Op::Consume,
            msg_id: Some(msg_id.to_string()),
            payload: None,
            handle: Some(handle.to_string()),
            retry_count,
            timestamp_ms,
        }
    }

    /// Builds an `Ack` record.
    pub fn ack(handle: &str, timestamp_ms: i64) -> Self {
        Self {
            op: Op::Ack,
            msg_id: None,
            payload: None,
            handle: Some(handle.to_string()),
            retry_count: 0,
            timestamp_ms,
        }
    }

    /// Builds a `Nack` record.
    pub fn nack(handle: &str, timestamp_ms: i64) -> Self {
        Self {
            op: Op::Nack,
            msg_id: None,
            payload: None,
            handle: Some(handle.to_string()),
            retry_count: 0,
            timestamp_ms,
        }
    }

    /// Decodes the base64 `payload` field, if present.
    pub fn decode_payload(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.payload.as_deref().map(|p| BASE64.decode(p))
    }

    /// Encodes this record as a single JSON line, without a trailing
    /// newline.
    pub fn encode_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a single line (without its trailing newline) into a
    /// record.
    pub fn decode_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
