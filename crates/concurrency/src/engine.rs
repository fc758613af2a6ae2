//! The queue engine: the monitor owning a queue's ready FIFO, in-flight
//! map, retry counters, optional dead-letter sink, and write-ahead log.
//!
//! One [`QueueEngine`] instance owns one [`parking_lot::Mutex`] guarding
//! all mutable state, and one [`parking_lot::Condvar`] used to wake
//! consumers blocked on an empty ready queue. Every public operation
//! acquires the monitor for its entire duration; WAL appends happen
//! while the monitor is held so the in-memory and on-disk views never
//! diverge from each other's perspective of the last committed
//! transition.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};

use relayq_core::{Error, Message, MessageId, QueueConfig, Receipt, ReceiptHandle, Result};
use relayq_durability::{LogEntry, Wal};

use crate::cancellation::CancellationToken;

/// An in-flight delivery: a message handed to a consumer but not yet
/// acknowledged or rejected.
struct InFlightEntry {
    message: Message,
    consumed_at: Instant,
    retry_count: u32,
}

struct Inner {
    ready: VecDeque<Message>,
    in_flight: HashMap<ReceiptHandle, InFlightEntry>,
    retry_counts: HashMap<MessageId, u32>,
    wal: Option<Wal>,
}

/// The delivery engine for a single queue.
///
/// `QueueEngine` is the monitor described in the module docs: `publish`,
/// `consume`, `acknowledge`, `nack`, and the scanner's `scan_timeouts`
/// all serialize through one mutex. It has no thread of its own; the
/// engine crate's `Queue` wrapper owns the visibility scanner thread
/// and drives `scan_timeouts` from it.
pub struct QueueEngine {
    name: String,
    config: QueueConfig,
    state: Mutex<Inner>,
    not_empty: Condvar,
    closed: AtomicBool,
    dead_letter: RwLock<Option<Arc<QueueEngine>>>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl QueueEngine {
    /// Opens (or creates) the queue named `name` with `config`, replaying
    /// its write-ahead log if `config.log_directory` is set.
    ///
    /// `dead_letter` must already be resolved by the caller (normally
    /// the registry) before construction, because replay itself may
    /// need to route exhausted in-flight messages to it.
    pub fn open(
        name: impl Into<String>,
        config: QueueConfig,
        dead_letter: Option<Arc<QueueEngine>>,
    ) -> Result<Self> {
        let name = name.into();
        let wal = match &config.log_directory {
            Some(dir) => Some(Wal::open(dir.join(format!("{name}.log")))?),
            None => None,
        };
        let engine = Self {
            name,
            config,
            state: Mutex::new(Inner {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
                retry_counts: HashMap::new(),
                wal,
            }),
            not_empty: Condvar::new(),
            closed: AtomicBool::new(false),
            dead_letter: RwLock::new(dead_letter),
        };
        engine.replay()?;
        Ok(engine)
    }

    /// The name this engine was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration this engine was opened with.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Replaces the dead-letter target. Used by the registry when a DLQ
    /// is created lazily after the parent queue already exists.
    pub fn set_dead_letter(&self, dlq: Option<Arc<QueueEngine>>) {
        *self.dead_letter.write() = dlq;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Appends `message` to the ready queue, durably if a log is
    /// configured, and wakes any consumer blocked on emptiness.
    ///
    /// A WAL failure is logged and does not fail the call: the message
    /// is still enqueued in memory, trading durability for liveness (see
    /// the crate-level error design notes).
    pub fn publish(&self, message: Message) -> Result<()> {
        self.ensure_open()?;
        let mut guard = self.state.lock();
        let retry_count = guard.retry_counts.get(&message.id).copied().unwrap_or(0);
        let now = now_ms();
        if let Some(wal) = guard.wal.as_mut() {
            if let Err(err) = wal.append(&LogEntry::publish(
                &message.id.to_string(),
                &message.payload,
                retry_count,
                now,
            )) {
                tracing::warn!(
                    target: "relayq::engine",
                    queue = %self.name,
                    msg_id = %message.id,
                    error = %err,
                    "WAL append failed on publish; continuing in-memory"
                );
            }
        }
        guard.ready.push_back(message);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Blocks until a message is available, then removes it from the
    /// ready queue and returns a fresh receipt. Re-checks the ready
    /// queue on every wake, since a broadcast wake may race several
    /// consumers for one message.
    pub fn consume(&self, cancel: &CancellationToken) -> Result<Receipt> {
        let mut guard = self.state.lock();
        loop {
            self.ensure_open()?;
            if let Some(message) = guard.ready.pop_front() {
                let handle = ReceiptHandle::new();
                let retry_count = guard.retry_counts.get(&message.id).copied().unwrap_or(0);
                let now = now_ms();
                if let Some(wal) = guard.wal.as_mut() {
                    if let Err(err) = wal.append(&LogEntry::consume(
                        &message.id.to_string(),
                        &handle.to_string(),
                        retry_count,
                        now,
                    )) {
                        tracing::warn!(
                            target: "relayq::engine",
                            queue = %self.name,
                            msg_id = %message.id,
                            error = %err,
                            "WAL append failed on consume; continuing in-memory"
                        );
                    }
                }
                guard.in_flight.insert(
                    handle,
                    InFlightEntry {
                        message: message.clone(),
                        consumed_at: Instant::now(),
                        retry_count,
                    },
                );
                return Ok(Receipt {
                    handle,
                    message,
                    retry_count,
                });
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            // Bounded wait so we periodically re-observe cancellation
            // even if no publish or requeue ever wakes us.
            self.not_empty.wait_for(&mut guard, Duration::from_millis(50));
        }
    }

    /// Finalizes a delivery successfully: removes it from the in-flight
    /// map and clears its retry counter.
    pub fn acknowledge(&self, handle: ReceiptHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let entry = guard
            .in_flight
            .remove(&handle)
            .ok_or_else(|| Error::InvalidReceipt(handle.to_string()))?;
        guard.retry_counts.remove(&entry.message.id);
        let now = now_ms();
        if let Some(wal) = guard.wal.as_mut() {
            if let Err(err) = wal.append(&LogEntry::ack(&handle.to_string(), now)) {
                tracing::warn!(
                    target: "relayq::engine",
                    queue = %self.name,
                    %handle,
                    error = %err,
                    "WAL append failed on ack; continuing in-memory"
                );
            }
        }
        Ok(())
    }

    /// Rejects a delivery explicitly, routing it through
    /// requeue-or-dead-letter.
    pub fn nack(&self, handle: ReceiptHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let entry = guard
            .in_flight
            .remove(&handle)
            .ok_or_else(|| Error::InvalidReceipt(handle.to_string()))?;
        self.requeue_or_dead_letter(&mut guard, &handle, entry.message, entry.retry_count)
    }

    /// Invoked by the visibility scanner: finds every in-flight entry
    /// whose visibility timeout has elapsed and routes each through
    /// requeue-or-dead-letter. Returns the number of entries processed.
    ///
    /// Expired handles are collected into a separate list before any
    /// entry is removed, so the in-flight map is never mutated while
    /// being iterated.
    pub fn scan_timeouts(&self) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let mut guard = self.state.lock();
        let timeout = self.config.visibility_timeout;
        let now = Instant::now();
        let expired: Vec<ReceiptHandle> = guard
            .in_flight
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.consumed_at) > timeout)
            .map(|(handle, _)| *handle)
            .collect();
        let count = expired.len();
        for handle in expired {
            if let Some(entry) = guard.in_flight.remove(&handle) {
                self.requeue_or_dead_letter(&mut guard, &handle, entry.message, entry.retry_count)?;
            }
        }
        Ok(count)
    }

    /// Requeues `message` if it has retries remaining, otherwise routes
    /// it to the dead-letter queue (or drops it with a warning if none
    /// is configured). Appends a NACK record for the delivery this
    /// message is leaving.
    fn requeue_or_dead_letter(
        &self,
        guard: &mut MutexGuard<'_, Inner>,
        handle: &ReceiptHandle,
        message: Message,
        prior_retry_count: u32,
    ) -> Result<()> {
        let now = now_ms();
        if let Some(wal) = guard.wal.as_mut() {
            if let Err(err) = wal.append(&LogEntry::nack(&handle.to_string(), now)) {
                tracing::warn!(
                    target: "relayq::engine",
                    queue = %self.name,
                    %handle,
                    error = %err,
                    "WAL append failed on nack; continuing in-memory"
                );
            }
        }

        let new_count = prior_retry_count + 1;
        if new_count >= self.config.max_retries {
            guard.retry_counts.remove(&message.id);
            let dlq = self.dead_letter.read().clone();
            match dlq {
                Some(dlq) => {
                    tracing::info!(
                        target: "relayq::engine",
                        queue = %self.name,
                        msg_id = %message.id,
                        retry_count = new_count,
                        dlq = %dlq.name,
                        "routing exhausted message to dead-letter queue"
                    );
                    dlq.publish(message)?;
                }
                None => {
                    tracing::warn!(
                        target: "relayq::engine",
                        queue = %self.name,
                        msg_id = %message.id,
                        retry_count = new_count,
                        "dropping message: retries exhausted and no dead-letter queue configured"
                    );
                }
            }
        } else {
            guard.retry_counts.insert(message.id, new_count);
            guard.ready.push_back(message);
            self.not_empty.notify_all();
        }
        Ok(())
    }

    /// Rebuilds in-memory state from the write-ahead log, treats every
    /// message still in flight at the end of the log as an implicit
    /// NACK, then compacts the log to a snapshot of surviving state.
    fn replay(&self) -> Result<()> {
        let entries = {
            let guard = self.state.lock();
            match guard.wal.as_ref() {
                Some(wal) => wal.read_all()?,
                None => return Ok(()),
            }
        };
        if entries.is_empty() {
            return Ok(());
        }

        let mut guard = self.state.lock();
        for entry in &entries {
            self.apply_replay_entry(&mut guard, entry)?;
        }

        let stranded: Vec<(ReceiptHandle, InFlightEntry)> = guard.in_flight.drain().collect();
        for (handle, entry) in stranded {
            tracing::info!(
                target: "relayq::engine",
                queue = %self.name,
                msg_id = %entry.message.id,
                "treating in-flight message stranded by restart as an implicit nack"
            );
            self.requeue_or_dead_letter(&mut guard, &handle, entry.message, entry.retry_count)?;
        }

        self.compact_locked(&mut guard)?;
        Ok(())
    }

    fn apply_replay_entry(
        &self,
        guard: &mut MutexGuard<'_, Inner>,
        entry: &LogEntry,
    ) -> Result<()> {
        use relayq_durability::Op;
        match entry.op {
            Op::Publish => {
                let Some(msg_id) = entry.msg_id.as_deref() else {
                    return Ok(());
                };
                let Ok(id) = MessageId::from_string(msg_id) else {
                    return Ok(());
                };
                let payload = match entry.decode_payload() {
                    Some(Ok(bytes)) => bytes,
                    _ => return Ok(()),
                };
                if entry.retry_count > 0 {
                    guard.retry_counts.insert(id, entry.retry_count);
                }
                guard.ready.push_back(Message::with_id(id, payload));
            }
            Op::Consume => {
                let (Some(msg_id), Some(handle_str)) =
                    (entry.msg_id.as_deref(), entry.handle.as_deref())
                else {
                    return Ok(());
                };
                let Ok(id) = MessageId::from_string(msg_id) else {
                    return Ok(());
                };
                let Ok(handle) = ReceiptHandle::from_string(handle_str) else {
                    return Ok(());
                };
                if let Some(pos) = guard.ready.iter().position(|m| m.id == id) {
                    let message = guard.ready.remove(pos).expect("position just located");
                    guard.in_flight.insert(
                        handle,
                        InFlightEntry {
                            message,
                            consumed_at: Instant::now(),
                            retry_count: entry.retry_count,
                        },
                    );
                }
                // A consume with no matching ready message means the
                // publish was itself lost or already consumed; no
                // placeholder is reconstructed.
            }
            Op::Ack => {
                let Some(handle_str) = entry.handle.as_deref() else {
                    return Ok(());
                };
                let Ok(handle) = ReceiptHandle::from_string(handle_str) else {
                    return Ok(());
                };
                if let Some(in_flight) = guard.in_flight.remove(&handle) {
                    guard.retry_counts.remove(&in_flight.message.id);
                }
            }
            Op::Nack => {
                let Some(handle_str) = entry.handle.as_deref() else {
                    return Ok(());
                };
                let Ok(handle) = ReceiptHandle::from_string(handle_str) else {
                    return Ok(());
                };
                if let Some(in_flight) = guard.in_flight.remove(&handle) {
                    self.requeue_or_dead_letter(
                        guard,
                        &handle,
                        in_flight.message,
                        in_flight.retry_count,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn compact_locked(&self, guard: &mut MutexGuard<'_, Inner>) -> Result<()> {
        let snapshot: Vec<LogEntry> = guard
            .ready
            .iter()
            .map(|message| {
                let retry_count = guard.retry_counts.get(&message.id).copied().unwrap_or(0);
                LogEntry::publish(&message.id.to_string(), &message.payload, retry_count, now_ms())
            })
            .collect();
        if let Some(wal) = guard.wal.as_mut() {
            wal.compact(&snapshot)?;
        }
        Ok(())
    }

    /// Signals the engine closed: further calls to `publish`, `consume`,
    /// and `acknowledge`/`nack` fail fast with [`Error::Closed`]. Flushes
    /// and releases the write-ahead log.
    pub fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let mut guard = self.state.lock();
        self.not_empty.notify_all();
        if let Some(wal) = guard.wal.take() {
            wal.close()?;
        }
        Ok(())
    }

    /// Number of messages currently in the ready queue. Intended for
    /// tests and diagnostics, not hot-path logic.
    pub fn ready_len(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Number of deliveries currently outstanding (in flight). Intended
    /// for tests and diagnostics.
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}
