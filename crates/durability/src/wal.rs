//! Append-only durable log for a single queue.
//!
//! Durability policy is flush-per-append: every [`Wal::append`] calls
//! `sync_data` before returning, so a crash immediately after a
//! successful append is guaranteed to observe that record on replay.
//! There is deliberately no batching knob: batching would contradict
//! the at-least-once guarantee this type exists to provide.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use relayq_core::{Error, Result};

use crate::codec::LogEntry;

/// A durable, append-only log of [`LogEntry`] records backing one queue.
pub struct Wal {
    path: PathBuf,
    file: File,
}

impl Wal {
    /// Opens (creating if necessary) the log file at `path`, ready for
    /// appends. Parent directories are created as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entry` and flushes it to stable storage before
    /// returning.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let line = entry
            .encode_line()
            .map_err(|e| Error::Corruption(e.to_string()))?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Reads every decodable record currently on disk, in file order.
    /// Corrupt or truncated lines are skipped with a warning rather
    /// than failing the read, so replay always makes forward progress.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        read_entries(&self.path)
    }

    /// Atomically replaces the log's contents with exactly `survivors`,
    /// in order. Implemented as write-to-sibling-then-rename, which is
    /// atomic on the filesystems this crate targets. Callers are
    /// responsible for serializing calls to `compact` with any
    /// concurrent `append` (the queue engine's monitor already does
    /// this).
    pub fn compact(&mut self, survivors: &[LogEntry]) -> Result<()> {
        let tmp_path = sibling_tmp_path(&self.path);
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in survivors {
                let line = entry
                    .encode_line()
                    .map_err(|e| Error::Corruption(e.to_string()))?;
                tmp.write_all(line.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        tracing::debug!(
            target: "relayq::wal",
            path = %self.path.display(),
            survivors = survivors.len(),
            "compacted log"
        );
        Ok(())
    }

    /// Flushes and releases the file handle. Consuming `self` prevents
    /// further use after close.
    pub fn close(mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Reads every decodable [`LogEntry`] from `path` in file order. A
/// missing file is treated as an empty log, not an error. Any line that
/// fails to decode -- including a partially written terminal line left
/// by a crash mid-append -- is skipped with a `tracing::warn!` rather
/// than aborting the read.
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match LogEntry::decode_line(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                let is_terminal = i == lines.len() - 1;
                tracing::warn!(
                    target: "relayq::wal",
                    path = %path.display(),
                    line_number = i,
                    terminal = is_terminal,
                    error = %err,
                    "skipping corrupt log line"
                );
            }
        }
    }
    Ok(entries)
}
