//! Core data types shared by the durability, concurrency, and engine crates:
//! message identity, receipts, and queue configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message, stable for the message's lifetime
/// including across a WAL replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a fresh, random message id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reconstructs a message id from its canonical string form, as
    /// written into a WAL record.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token naming exactly one delivery of exactly one message.
/// Redeliveries of the same message are given a fresh handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(Uuid);

impl ReceiptHandle {
    /// Generates a fresh receipt handle for a new delivery.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reconstructs a receipt handle from its canonical string form.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ReceiptHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message, with an opaque byte payload. Messages are immutable once
/// created; redelivery never changes `id` or `payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity that survives across every redelivery of this message.
    pub id: MessageId,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

impl Message {
    /// Builds a new message with a freshly generated id.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: MessageId::new(),
            payload: payload.into(),
        }
    }

    /// Rebuilds a message with an explicit id, used by WAL replay where
    /// the id must be preserved exactly.
    pub fn with_id(id: MessageId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// A single delivery of a message, returned by `consume`.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// Handle naming this specific delivery.
    pub handle: ReceiptHandle,
    /// The delivered message.
    pub message: Message,
    /// Number of prior failed deliveries of this message (0 on first
    /// delivery).
    pub retry_count: u32,
}

/// Immutable configuration for a queue, supplied at construction.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Duration after delivery within which a consumer must ACK or NACK
    /// before the message becomes eligible for redelivery.
    pub visibility_timeout: Duration,
    /// Maximum number of deliveries before a message is routed to the
    /// dead-letter queue (or dropped, if none is configured).
    pub max_retries: u32,
    /// Name of another registered queue to receive messages that exhaust
    /// `max_retries`. Resolved by the registry, not by the engine itself.
    pub dead_letter_queue_name: Option<String>,
    /// Directory holding this queue's write-ahead log. `None` disables
    /// durability: the queue is in-memory only and has no replay.
    pub log_directory: Option<PathBuf>,
    /// Interval between visibility-scanner ticks.
    pub scan_interval: Duration,
}

impl QueueConfig {
    /// Default scan interval used in production (1 second).
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(1000);

    /// Default visibility timeout (30 seconds), matching common SQS
    /// deployments.
    pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Self::DEFAULT_VISIBILITY_TIMEOUT,
            max_retries: 5,
            dead_letter_queue_name: None,
            log_directory: None,
            scan_interval: Self::DEFAULT_SCAN_INTERVAL,
        }
    }
}
