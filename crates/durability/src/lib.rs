//! Write-ahead log durability for relayq queues.
//!
//! This crate owns the on-disk record format ([`codec`]) and the
//! append/compact/replay file operations ([`wal`]). It has no notion of
//! queue semantics; the concurrency crate interprets [`codec::LogEntry`]
//! records and decides when to append or compact.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod wal;

pub use codec::{LogEntry, Op};
pub use wal::{read_entries, Wal};
