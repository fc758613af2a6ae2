//! Public queue handle: wires a [`QueueEngine`] to its visibility
//! scanner thread. This is the type applications hold; the engine and
//! durability crates are internal collaborators reached only through
//! it.

use std::sync::Arc;

use parking_lot::Mutex;

use relayq_concurrency::{CancellationToken, QueueEngine};
use relayq_core::{Message, MessageId, QueueConfig, Receipt, ReceiptHandle, Result};

use crate::scanner::VisibilityScanner;

/// A single named queue: its delivery engine plus the background
/// thread that redelivers timed-out messages.
pub struct Queue {
    engine: Arc<QueueEngine>,
    scanner: Mutex<Option<VisibilityScanner>>,
}

impl Queue {
    pub(crate) fn new(engine: Arc<QueueEngine>) -> Arc<Self> {
        let interval = engine.config().scan_interval;
        let scanner = VisibilityScanner::spawn(Arc::clone(&engine), interval);
        Arc::new(Self {
            engine,
            scanner: Mutex::new(Some(scanner)),
        })
    }

    pub(crate) fn engine_arc(&self) -> Arc<QueueEngine> {
        Arc::clone(&self.engine)
    }

    /// This queue's name.
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// This queue's configuration.
    pub fn config(&self) -> &QueueConfig {
        self.engine.config()
    }

    /// Enqueues `payload` as a new message and returns its id.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<MessageId> {
        let message = Message::new(payload);
        let id = message.id;
        self.engine.publish(message)?;
        Ok(id)
    }

    /// Blocks until a message is available, or `cancel` fires.
    pub fn consume(&self, cancel: &CancellationToken) -> Result<Receipt> {
        self.engine.consume(cancel)
    }

    /// Finalizes a delivery successfully.
    pub fn acknowledge(&self, handle: ReceiptHandle) -> Result<()> {
        self.engine.acknowledge(handle)
    }

    /// Rejects a delivery, triggering requeue or dead-lettering.
    pub fn nack(&self, handle: ReceiptHandle) -> Result<()> {
        self.engine.nack(handle)
    }

    /// Number of messages currently ready for delivery.
    pub fn ready_len(&self) -> usize {
        self.engine.ready_len()
    }

    /// Number of deliveries currently outstanding.
    pub fn in_flight_len(&self) -> usize {
        self.engine.in_flight_len()
    }

    /// Stops the visibility scanner and flushes the write-ahead log.
    /// Idempotent: a second call is a no-op beyond re-closing the
    /// already-closed engine.
    pub fn close(&self) -> Result<()> {
        if let Some(mut scanner) = self.scanner.lock().take() {
            scanner.shutdown();
        }
        self.engine.close()
    }
}
