//! Integration tests exercising `QueueEngine` invariants under
//! concurrent load: no loss/no duplication, the retry bound, and
//! terminal fate of every message.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relayq_concurrency::{CancellationToken, QueueEngine};
use relayq_core::{Message, QueueConfig};

fn config() -> QueueConfig {
    QueueConfig {
        visibility_timeout: Duration::from_secs(5),
        max_retries: 3,
        dead_letter_queue_name: None,
        log_directory: None,
        scan_interval: Duration::from_millis(50),
    }
}

#[test]
fn no_loss_no_duplication_under_concurrent_load() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 50;
    const CONSUMERS: usize = 4;

    let engine = Arc::new(QueueEngine::open("q", config(), None).unwrap());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let payload = format!("p{p}-m{i}").into_bytes();
                    engine.publish(Message::new(payload)).unwrap();
                }
            })
        })
        .collect();
    for handle in producers {
        handle.join().unwrap();
    }

    let total = PRODUCERS * PER_PRODUCER;
    // Every consumer claims a share of a shared countdown before
    // calling `consume`, so across all threads `consume` is called
    // exactly `total` times -- never more than what was published,
    // which would otherwise risk one thread blocking forever once the
    // queue is drained.
    let remaining = Arc::new(AtomicUsize::new(total));
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                let cancel = CancellationToken::new();
                let mut received = Vec::new();
                loop {
                    let claimed = remaining
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                            if v > 0 {
                                Some(v - 1)
                            } else {
                                None
                            }
                        })
                        .is_ok();
                    if !claimed {
                        break;
                    }
                    let receipt = engine.consume(&cancel).unwrap();
                    engine.acknowledge(receipt.handle).unwrap();
                    received.push(receipt.message.payload);
                }
                received
            })
        })
        .collect();

    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut total_received = 0;
    for handle in consumers {
        for payload in handle.join().unwrap() {
            assert!(seen.insert(payload), "message delivered more than once");
            total_received += 1;
        }
    }

    assert_eq!(total_received, total);
    assert_eq!(engine.ready_len(), 0);
    assert_eq!(engine.in_flight_len(), 0);
}

#[test]
fn retry_count_never_exceeds_max_retries() {
    let mut cfg = config();
    cfg.max_retries = 3;
    let engine = QueueEngine::open("q", cfg, None).unwrap();
    engine.publish(Message::new(b"a".to_vec())).unwrap();

    let cancel = CancellationToken::new();
    let mut deliveries = 0;
    loop {
        if engine.ready_len() == 0 && engine.in_flight_len() == 0 {
            break;
        }
        let receipt = engine.consume(&cancel).unwrap();
        deliveries += 1;
        assert!(receipt.retry_count < 3, "retry bound exceeded");
        engine.nack(receipt.handle).unwrap();
    }
    assert_eq!(deliveries, 3);
}

#[test]
fn every_message_reaches_a_terminal_fate() {
    let mut cfg = config();
    cfg.max_retries = 2;
    let dlq = Arc::new(QueueEngine::open("dlq", config(), None).unwrap());
    let engine = QueueEngine::open("q", cfg, Some(Arc::clone(&dlq))).unwrap();

    engine.publish(Message::new(b"acked".to_vec())).unwrap();
    engine.publish(Message::new(b"dead-lettered".to_vec())).unwrap();

    let cancel = CancellationToken::new();
    let first = engine.consume(&cancel).unwrap();
    engine.acknowledge(first.handle).unwrap();

    loop {
        if engine.ready_len() == 0 && engine.in_flight_len() == 0 {
            break;
        }
        let receipt = engine.consume(&cancel).unwrap();
        engine.nack(receipt.handle).unwrap();
    }

    assert_eq!(engine.ready_len(), 0);
    assert_eq!(engine.in_flight_len(), 0);
    assert_eq!(dlq.ready_len(), 1);
}
