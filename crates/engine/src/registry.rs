//! Process-wide, atomic create-if-absent map from queue name to
//! [`Queue`] instance.
//!
//! Modeled on the `OPEN_DATABASES` registry this codebase otherwise
//! keeps as a global singleton, but scoped to one instance per
//! `QueueRegistry` rather than a process-wide `static`, and holding
//! strong `Arc`s rather than `Weak` ones: a registered queue's
//! background scanner thread keeps it alive until explicitly deleted.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use relayq_concurrency::QueueEngine;
use relayq_core::{Error, QueueConfig, Result};

use crate::queue::Queue;

/// An atomic create-if-absent registry of named queues.
pub struct QueueRegistry {
    queues: DashMap<String, Arc<Queue>>,
}

impl QueueRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Returns the queue named `name`, creating it with `config` if it
    /// doesn't already exist. Concurrent calls with the same `name`
    /// are guaranteed to observe and return the same instance.
    ///
    /// If `config.dead_letter_queue_name` is set and that queue doesn't
    /// exist yet, it is created first with `QueueConfig::default()` and
    /// wired onto the new queue before `QueueEngine::open` runs replay,
    /// since replay itself may need to route exhausted messages there.
    pub fn create_queue(&self, name: impl Into<String>, config: QueueConfig) -> Result<Arc<Queue>> {
        let name = name.into();
        if let Some(existing) = self.queues.get(&name) {
            return Ok(Arc::clone(existing.value()));
        }

        let dead_letter = match config.dead_letter_queue_name.clone() {
            Some(dlq_name) => Some(self.create_queue(dlq_name, QueueConfig::default())?),
            None => None,
        };

        match self.queues.entry(name.clone()) {
            Entry::Occupied(occupied) => Ok(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let dlq_engine: Option<Arc<QueueEngine>> =
                    dead_letter.as_ref().map(|q| q.engine_arc());
                let engine = Arc::new(QueueEngine::open(name.clone(), config, dlq_engine)?);
                let queue = Queue::new(engine);
                vacant.insert(Arc::clone(&queue));
                tracing::info!(target: "relayq::registry", queue = %name, "queue created");
                Ok(queue)
            }
        }
    }

    /// Looks up an already-registered queue.
    pub fn get_queue(&self, name: &str) -> Result<Arc<Queue>> {
        self.queues
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::QueueNotFound(name.to_string()))
    }

    /// Removes and closes a queue. Deleting an unknown name is a silent
    /// no-op, since the caller's desired post-condition -- the name is
    /// not registered -- already holds.
    pub fn delete_queue(&self, name: &str) -> Result<()> {
        if let Some((_, queue)) = self.queues.remove(name) {
            queue.close()?;
            tracing::info!(target: "relayq::registry", queue = %name, "queue deleted");
        }
        Ok(())
    }

    /// Lists the names of all currently registered queues.
    pub fn list_queues(&self) -> Vec<String> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use std::thread;

    #[test]
    fn create_queue_is_idempotent() {
        let registry = QueueRegistry::new();
        let a = registry.create_queue("orders", QueueConfig::default()).unwrap();
        let b = registry.create_queue("orders", QueueConfig::default()).unwrap();
        assert!(StdArc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_create_queue_returns_one_instance() {
        let registry = StdArc::new(QueueRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = StdArc::clone(&registry);
                thread::spawn(move || registry.create_queue("orders", QueueConfig::default()).unwrap())
            })
            .collect();
        let queues: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for queue in &queues[1..] {
            assert!(StdArc::ptr_eq(&queues[0], queue));
        }
    }

    #[test]
    fn get_queue_unknown_name_fails() {
        let registry = QueueRegistry::new();
        let err = registry.get_queue("missing").unwrap_err();
        assert!(matches!(err, Error::QueueNotFound(_)));
    }

    #[test]
    fn delete_unknown_queue_is_a_no_op() {
        let registry = QueueRegistry::new();
        registry.delete_queue("missing").unwrap();
    }

    #[test]
    fn create_queue_with_dlq_name_auto_creates_dlq() {
        let registry = QueueRegistry::new();
        let config = QueueConfig {
            dead_letter_queue_name: Some("orders-dlq".to_string()),
            ..QueueConfig::default()
        };
        registry.create_queue("orders", config).unwrap();
        let dlq = registry.get_queue("orders-dlq").unwrap();
        assert_eq!(dlq.name(), "orders-dlq");
    }

    #[test]
    fn list_queues_reflects_registered_names() {
        let registry = QueueRegistry::new();
        registry.create_queue("a", QueueConfig::default()).unwrap();
        registry.create_queue("b", QueueConfig::default()).unwrap();
        let mut names = registry.list_queues();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
