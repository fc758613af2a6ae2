//! Error types shared across the relayq crates.
//!
//! `Error` is the single error type returned by every public operation in
//! this workspace, from WAL I/O up through the queue engine and registry.
//! We use `thiserror` for the `Display`/`std::error::Error` boilerplate,
//! the same way the rest of this codebase derives its error enums.

use thiserror::Error;

/// Result type alias used throughout relayq.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the relayq crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O failure (WAL append, compaction, or file open).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A receipt handle passed to `acknowledge` or `nack` is not currently
    /// in flight. Either it was already finalized, or it never existed.
    #[error("invalid or expired receipt handle: {0}")]
    InvalidReceipt(String),

    /// `get_queue` (or an equivalent lookup) was given a name with no
    /// registered queue.
    #[error("no queue registered with name: {0}")]
    QueueNotFound(String),

    /// A blocked `consume` observed the caller's cancellation token fire.
    #[error("consume was cancelled")]
    Cancelled,

    /// An operation was invoked on a queue after `close()` completed.
    #[error("queue is closed")]
    Closed,

    /// A write-ahead log record could not be encoded or decoded where
    /// failure cannot simply be skipped (for example, serializing a
    /// record to append or compact). Corrupt records encountered while
    /// reading an existing log during replay are logged and skipped
    /// instead of raised here.
    #[error("corrupt log entry: {0}")]
    Corruption(String),
}

impl Error {
    /// Whether retrying the operation that produced this error is likely
    /// to succeed without caller intervention. Only I/O failures are
    /// transient in the sense this crate can reason about; everything
    /// else reflects a caller or state error that retrying won't fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
