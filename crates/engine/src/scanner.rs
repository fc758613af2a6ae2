//! Visibility scanner: a single background thread per queue that
//! periodically finds timed-out in-flight deliveries and routes them
//! back through the engine's requeue-or-dead-letter logic.
//!
//! The scanner carries no queue state of its own -- all of that lives
//! under the engine's monitor. It sleeps on a cancellable condition
//! variable rather than `thread::sleep`, so `shutdown` wakes it
//! immediately instead of waiting out the rest of the current interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use relayq_concurrency::QueueEngine;

/// Owns the background thread that drives one queue's periodic
/// visibility scan. Dropping (or explicitly shutting down) a scanner
/// cancels the thread and joins it before returning.
pub struct VisibilityScanner {
    shutdown: Arc<AtomicBool>,
    gate: Arc<Mutex<()>>,
    wake: Arc<Condvar>,
    handle: Option<JoinHandle<()>>,
}

impl VisibilityScanner {
    /// Spawns the scanner thread for `engine`, ticking every `interval`.
    pub fn spawn(engine: Arc<QueueEngine>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(Mutex::new(()));
        let wake = Arc::new(Condvar::new());

        let handle = {
            let shutdown = Arc::clone(&shutdown);
            let gate = Arc::clone(&gate);
            let wake = Arc::clone(&wake);
            std::thread::Builder::new()
                .name(format!("relayq-scan-{}", engine.name()))
                .spawn(move || scan_loop(engine, interval, &shutdown, &gate, &wake))
                .expect("failed to spawn visibility scanner thread")
        };

        Self {
            shutdown,
            gate,
            wake,
            handle: Some(handle),
        }
    }

    /// Cancels the scan loop and joins its thread. Idempotent: calling
    /// this more than once (or letting `Drop` call it after an explicit
    /// call) is safe.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Lock the gate before notifying to rule out a lost wakeup: the
        // loop is either already inside `wait_for` (and this notify
        // reaches it) or hasn't yet reached it and will observe
        // `shutdown` set on its next check.
        {
            let _guard = self.gate.lock();
            self.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for VisibilityScanner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scan_loop(
    engine: Arc<QueueEngine>,
    interval: Duration,
    shutdown: &AtomicBool,
    gate: &Mutex<()>,
    wake: &Condvar,
) {
    loop {
        {
            let mut guard = gate.lock();
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            wake.wait_for(&mut guard, interval);
        }
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        if let Err(err) = engine.scan_timeouts() {
            tracing::warn!(
                target: "relayq::scanner",
                queue = %engine.name(),
                error = %err,
                "visibility scan failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayq_concurrency::CancellationToken;
    use relayq_core::{Message, QueueConfig};
    use std::time::Duration;

    #[test]
    fn scanner_redelivers_timed_out_message() {
        let config = QueueConfig {
            visibility_timeout: Duration::from_millis(30),
            max_retries: 3,
            dead_letter_queue_name: None,
            log_directory: None,
            scan_interval: Duration::from_millis(10),
        };
        let engine = Arc::new(QueueEngine::open("q", config, None).unwrap());
        engine.publish(Message::new(b"a".to_vec())).unwrap();
        let cancel = CancellationToken::new();
        let first = engine.consume(&cancel).unwrap();

        let mut scanner = VisibilityScanner::spawn(Arc::clone(&engine), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(120));
        scanner.shutdown();

        let second = engine.consume(&cancel).unwrap();
        assert_eq!(first.message.id, second.message.id);
        assert_ne!(first.handle, second.handle);
    }

    #[test]
    fn shutdown_is_bounded_even_mid_interval() {
        let config = QueueConfig {
            visibility_timeout: Duration::from_secs(30),
            max_retries: 3,
            dead_letter_queue_name: None,
            log_directory: None,
            scan_interval: Duration::from_secs(30),
        };
        let engine = Arc::new(QueueEngine::open("q", config, None).unwrap());
        let mut scanner = VisibilityScanner::spawn(Arc::clone(&engine), Duration::from_secs(30));
        let start = std::time::Instant::now();
        scanner.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
