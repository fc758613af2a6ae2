//! # relayq
//!
//! An embeddable, durable, in-process message broker: SQS-style
//! at-least-once delivery with visibility-timeout redelivery, bounded
//! retries, dead-letter routing, and crash recovery via a write-ahead
//! log.
//!
//! relayq has no server process and no network protocol; a [`Queue`] is
//! just a Rust value your program owns, backed by a log file on disk if
//! you give it one.
//!
//! # Quick Start
//!
//! ```no_run
//! use relayq::{CancellationToken, QueueConfig, QueueRegistry};
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! fn main() -> relayq::Result<()> {
//!     let registry = QueueRegistry::new();
//!     let config = QueueConfig {
//!         visibility_timeout: Duration::from_secs(30),
//!         max_retries: 5,
//!         dead_letter_queue_name: Some("orders-dlq".to_string()),
//!         log_directory: Some(PathBuf::from("./data/queues")),
//!         scan_interval: QueueConfig::DEFAULT_SCAN_INTERVAL,
//!     };
//!     let orders = registry.create_queue("orders", config)?;
//!
//!     orders.publish(b"process payment #42".to_vec())?;
//!
//!     let cancel = CancellationToken::new();
//!     let receipt = orders.consume(&cancel)?;
//!     // ... do the work ...
//!     orders.acknowledge(receipt.handle)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Queue`] | publish / consume / acknowledge / nack against one named queue |
//! | [`QueueRegistry`] | atomic create-if-absent map from name to `Queue` |
//! | [`QueueConfig`] | visibility timeout, retry bound, DLQ wiring, log directory |
//! | [`CancellationToken`] | unblocks a consumer waiting in `consume()` |
//!
//! # Architecture
//!
//! Internal crates (`relayq-durability`, `relayq-concurrency`,
//! `relayq-engine`) implement the write-ahead log, the per-queue
//! delivery state machine, and the visibility scanner thread
//! respectively. Only the surface re-exported from this crate is
//! stable.

pub use relayq_concurrency::CancellationToken;
pub use relayq_core::{Error, Message, MessageId, QueueConfig, Receipt, ReceiptHandle, Result};
pub use relayq_engine::{Queue, QueueRegistry};
