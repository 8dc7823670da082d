//! Append-only event log on disk
//!
//! One JSON object per line in `events.log`. Every append is flushed and
//! `fdatasync`ed before it becomes visible to readers. The whole log is
//! indexed in memory on open.

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use relevx_core::{next_timestamp, Error, Event, EventLog, EventMarker, NewEvent, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct FileEventLog {
    writer: Mutex<LogWriter>,
    index: RwLock<Vec<Event>>,
    path: PathBuf,
}

struct LogWriter {
    file: BufWriter<File>,
    // Separate handle for sync_data
    raw: File,
}

impl LogWriter {
    fn append_line(&mut self, line: &[u8]) -> anyhow::Result<()> {
        self.file.write_all(line)?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.raw.sync_data()?;
        Ok(())
    }
}

impl FileEventLog {
    /// Open (or create) the log at `path` and index its events
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (index, torn_tail) = load_events(&path).map_err(unavailable)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open event log {}", path.display()))
            .map_err(unavailable)?;
        let raw = file.try_clone().map_err(unavailable)?;
        let mut writer = LogWriter {
            file: BufWriter::new(file),
            raw,
        };

        // Terminate a partial last line so the next append starts clean
        if torn_tail {
            writer.append_line(b"").map_err(unavailable)?;
        }

        debug!(path = %path.display(), events = index.len(), "opened event log");
        Ok(Self {
            writer: Mutex::new(writer),
            index: RwLock::new(index),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

impl EventLog for FileEventLog {
    fn query(&self, subject_type: &str, after: Option<&EventMarker>) -> Result<Vec<Event>> {
        Ok(self
            .index
            .read()
            .iter()
            .filter(|e| e.subject_type == subject_type && e.is_after(after))
            .cloned()
            .collect())
    }

    fn append(&self, event: NewEvent) -> Result<Event> {
        // Holding the writer lock orders timestamps and lines the same way
        let mut writer = self.writer.lock();
        let timestamp = next_timestamp(self.index.read().last().map(|e| e.timestamp));
        let event = event.into_event(Uuid::new_v4(), timestamp);

        let line = serde_json::to_vec(&event)?;
        writer.append_line(&line).map_err(unavailable)?;

        self.index.write().push(event.clone());
        Ok(event)
    }
}

/// Events in the log, ordered by timestamp, and whether the last line is unterminated
fn load_events(path: &Path) -> anyhow::Result<(Vec<Event>, bool)> {
    if !path.exists() {
        return Ok((Vec::new(), false));
    }

    let data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let torn_tail = !data.is_empty() && !data.ends_with(b"\n");

    let mut events = Vec::new();
    for (number, line) in String::from_utf8_lossy(&data).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            // A crash mid-append leaves a partial line
            Err(e) => warn!(line = number + 1, error = %e, "skipping unreadable event log line"),
        }
    }

    events.sort_by_key(|e| e.timestamp);
    Ok((events, torn_tail))
}

pub(crate) fn unavailable(err: impl std::fmt::Display) -> Error {
    Error::StoreUnavailable(err.to_string())
}
