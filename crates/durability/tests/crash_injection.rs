//! Crash-injection coverage: simulates a process dying mid-append by
//! truncating a well-formed log file, and checks that reading it back
//! makes forward progress instead of failing outright.

use std::fs::OpenOptions;
use std::io::Write;

use relayq_durability::{read_entries, LogEntry, Wal};
use tempfile::tempdir;

#[test]
fn replay_survives_a_truncated_terminal_record() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.log");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&LogEntry::publish("m1", b"one", 0, 1)).unwrap();
        wal.append(&LogEntry::publish("m2", b"two", 0, 2)).unwrap();
        wal.append(&LogEntry::publish("m3", b"three", 0, 3)).unwrap();
    }

    // Simulate a crash: append a partial record with no closing brace
    // and no trailing newline, as a writer interrupted mid-`write_all`
    // would leave behind.
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"op":"publish","msg_id":"m4","payload":"Zm91"#)
            .unwrap();
    }

    let entries = read_entries(&path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].msg_id.as_deref(), Some("m3"));
}

#[test]
fn replay_skips_a_corrupt_line_in_the_middle_and_keeps_going() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.log");

    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&LogEntry::publish("m1", b"one", 0, 1)).unwrap();
    }
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"not valid json at all\n").unwrap();
    }
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&LogEntry::publish("m3", b"three", 0, 3)).unwrap();
    }

    let entries = read_entries(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].msg_id.as_deref(), Some("m1"));
    assert_eq!(entries[1].msg_id.as_deref(), Some("m3"));
}

#[test]
fn compaction_is_atomic_with_respect_to_a_missing_tmp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.log");
    let mut wal = Wal::open(&path).unwrap();
    for i in 0..3 {
        wal.append(&LogEntry::publish(&format!("m{i}"), b"x", 0, i))
            .unwrap();
    }
    wal.compact(&[LogEntry::publish("m1", b"x", 0, 1)]).unwrap();

    // No leftover temp file after a successful compaction.
    assert!(!dir.path().join("orders.log.tmp").exists());
    assert_eq!(read_entries(&path).unwrap().len(), 1);
}
