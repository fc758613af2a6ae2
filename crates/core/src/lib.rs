//! Core types shared across the relayq crates.
//!
//! This crate defines the foundational types used throughout the broker:
//! - `Error` / `Result`: the error hierarchy shared by every crate
//! - `MessageId` / `ReceiptHandle`: identity for messages and deliveries
//! - `Message` / `Receipt`: the data that flows through a queue
//! - `QueueConfig`: immutable per-queue configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Message, MessageId, QueueConfig, Receipt, ReceiptHandle};
