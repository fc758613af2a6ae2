//! A small cancellation handle for blocked consumers.
//!
//! This is deliberately not tied to any async runtime: the core has no
//! such dependency. It is the same `AtomicBool` + `Condvar` shape the
//! engine crate uses for the visibility scanner's shutdown signal, so a
//! caller can unblock a `consume()` the same way a queue unblocks its
//! own background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct Shared {
    cancelled: AtomicBool,
    gate: Mutex<()>,
    condvar: Condvar,
}

/// A cloneable handle that lets one thread ask another, blocked in
/// [`crate::engine::QueueEngine::consume`], to stop waiting.
#[derive(Clone)]
pub struct CancellationToken {
    shared: Arc<Shared>,
}

impl CancellationToken {
    /// Creates a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                gate: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Signals cancellation. Safe to call more than once, and from any
    /// thread. The gate is acquired before notifying so a waiter cannot
    /// be caught between checking `is_cancelled` and entering its wait.
    pub fn cancel(&self) {
        let _guard = self.shared.gate.lock();
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.condvar.notify_all();
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
