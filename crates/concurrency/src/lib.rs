//! The queue delivery engine: the monitor that moves a message through
//! `Queued -> InFlight -> (Acknowledged | Requeued | Dead-Lettered |
//! Dropped)` under concurrent producers, consumers, and a visibility
//! scanner, and applies durable replay on restart.
//!
//! This crate has no background threads of its own -- the engine crate
//! owns the visibility scanner and drives it by calling
//! [`engine::QueueEngine::scan_timeouts`] on a timer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancellation;
pub mod engine;

pub use cancellation::CancellationToken;
pub use engine::QueueEngine;
