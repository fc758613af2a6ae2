//! Public queue and registry types: the surface applications embed.
//!
//! This crate wires together [`relayq_concurrency::QueueEngine`] (the
//! delivery state machine), the visibility scanner (this crate's own
//! background thread), and a process-wide registry of named queues.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod queue;
pub mod registry;
pub mod scanner;

pub use queue::Queue;
pub use registry::QueueRegistry;
pub use scanner::VisibilityScanner;
