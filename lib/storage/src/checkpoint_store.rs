// Checkpoint files: one gzip-compressed JSON document per checkpoint
use crate::event_log::unavailable;
use anyhow::{anyhow, Context};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use relevx_core::{check_fence, Checkpoint, CheckpointStore, Error, NewCheckpoint, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const EXTENSION: &str = "checkpoint";

/// Checkpoint history stored as `<root>/<subject>/<created_at_micros>-<id>.checkpoint`.
///
/// The decompressed file is a hex SHA-256 line followed by the checkpoint
/// JSON the digest covers. File names sort chronologically. The fence check
/// and the write share one in-process lock; separate processes writing the
/// same subject are not fenced against each other.
pub struct FileCheckpointStore {
    root: PathBuf,
    // Serializes fence check and write
    write_lock: Mutex<()>,
}

/// Name-level view of one checkpoint file
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    created_at: DateTime<Utc>,
    id: Uuid,
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(unavailable)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subjects that have at least one checkpoint directory, sorted
    pub fn subjects(&self) -> Result<Vec<String>> {
        let mut subjects = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(unavailable)? {
            let entry = entry.map_err(unavailable)?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    subjects.push(name.to_string());
                }
            }
        }
        subjects.sort();
        Ok(subjects)
    }

    fn subject_dir(&self, subject_type: &str) -> Result<PathBuf> {
        let valid = !subject_type.is_empty()
            && subject_type != "."
            && subject_type != ".."
            && !subject_type.contains(['/', '\\']);
        if !valid {
            return Err(Error::InvalidConfig(format!(
                "subject type '{}' cannot be used as a directory name",
                subject_type
            )));
        }
        Ok(self.root.join(subject_type))
    }

    /// Checkpoint files for a subject, oldest first
    fn entries(&self, subject_type: &str) -> Result<Vec<Entry>> {
        let dir = self.subject_dir(subject_type)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(EXTENSION) {
                continue;
            }
            match parse_file_name(&path) {
                Some((created_at, id)) => entries.push(Entry { created_at, id, path }),
                None => debug!(path = %path.display(), "ignoring unrecognised checkpoint file name"),
            }
        }

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn load(&self, subject_type: &str, entry: &Entry) -> Result<Checkpoint> {
        let body = read_verified(&entry.path).map_err(|e| Error::malformed(subject_type, format!("{:#}", e)))?;
        let checkpoint: Checkpoint =
            serde_json::from_slice(&body).map_err(|e| Error::malformed(subject_type, e))?;

        if checkpoint.id != entry.id || checkpoint.subject_type != subject_type {
            return Err(Error::malformed(
                subject_type,
                format!("{} does not hold checkpoint {}", entry.path.display(), entry.id),
            ));
        }
        Ok(checkpoint)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn latest(&self, subject_type: &str) -> Result<Option<Checkpoint>> {
        match self.entries(subject_type)?.last() {
            Some(entry) => self.load(subject_type, entry).map(Some),
            None => Ok(None),
        }
    }

    fn create(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint> {
        let _guard = self.write_lock.lock();
        let subject_type = checkpoint.subject_type.clone();
        let dir = self.subject_dir(&subject_type)?;

        let entries = self.entries(&subject_type)?;
        let latest = entries.last();
        check_fence(&subject_type, checkpoint.expected_previous, latest.map(|e| e.id))?;

        // File names must sort strictly after the previous checkpoint
        let now = truncate_micros(Utc::now());
        let created_at = match latest {
            Some(prev) if now <= prev.created_at => prev.created_at + Duration::microseconds(1),
            _ => now,
        };
        let checkpoint = checkpoint.into_checkpoint(Uuid::new_v4(), created_at);

        fs::create_dir_all(&dir).map_err(unavailable)?;
        let path = dir.join(file_name(&checkpoint));
        write_checkpoint(&path, &checkpoint).map_err(unavailable)?;

        info!(
            subject = %subject_type,
            checkpoint = %checkpoint.id,
            pairs = checkpoint.pairs_trained,
            "checkpoint written"
        );
        Ok(checkpoint)
    }

    fn history(&self, subject_type: &str) -> Result<Vec<Checkpoint>> {
        self.entries(subject_type)?
            .iter()
            .rev()
            .map(|entry| self.load(subject_type, entry))
            .collect()
    }
}

fn file_name(checkpoint: &Checkpoint) -> String {
    format!(
        "{:020}-{}.{}",
        checkpoint.created_at.timestamp_micros(),
        checkpoint.id,
        EXTENSION
    )
}

fn parse_file_name(path: &Path) -> Option<(DateTime<Utc>, Uuid)> {
    let stem = path.file_stem()?.to_str()?;
    let (stamp, id) = stem.split_once('-')?;
    let micros: i64 = stamp.parse().ok()?;
    let created_at = DateTime::from_timestamp(
        micros.div_euclid(1_000_000),
        (micros.rem_euclid(1_000_000) * 1_000) as u32,
    )?;
    Some((created_at, Uuid::parse_str(id).ok()?))
}

// File names carry microseconds; keep the record in step with its name
fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = ts.timestamp_subsec_nanos();
    ts - Duration::nanoseconds(i64::from(nanos % 1_000))
}

fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> anyhow::Result<()> {
    let json = serde_json::to_vec(checkpoint)?;
    let checksum = format!("{:x}", Sha256::digest(&json));

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(checksum.as_bytes())?;
    encoder.write_all(b"\n")?;
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    AtomicFile::new(path, OverwriteBehavior::DisallowOverwrite)
        .write(|f| f.write_all(&compressed))
        .with_context(|| format!("cannot write checkpoint {}", path.display()))?;
    Ok(())
}

/// Decompress a checkpoint file and return its JSON body if the checksum matches
fn read_verified(path: &Path) -> anyhow::Result<Vec<u8>> {
    let file = fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut data = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut data)
        .context("cannot decompress checkpoint")?;

    let split = data
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| anyhow!("missing checksum line"))?;
    let (expected, body) = (&data[..split], &data[split + 1..]);

    let actual = format!("{:x}", Sha256::digest(body));
    if actual.as_bytes() != expected {
        return Err(anyhow!(
            "checksum mismatch: expected {}, got {}",
            String::from_utf8_lossy(expected),
            actual
        ));
    }
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relevx_core::{EventMarker, Forecast};
    use tempfile::tempdir;

    fn new_checkpoint(expected_previous: Option<Uuid>) -> NewCheckpoint {
        NewCheckpoint {
            subject_type: "Widget".to_string(),
            last_event_marker: Some(EventMarker {
                event_id: Uuid::new_v4(),
                timestamp: Utc::now(),
            }),
            trained_state: vec![1, 2, 3, 4],
            forecast: Forecast::from([("name".to_string(), 0.6), ("created".to_string(), 0.4)]),
            fields: vec!["created".to_string(), "name".to_string()],
            pairs_trained: 2,
            expected_previous,
        }
    }

    #[test]
    fn test_create_then_latest() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();
        assert!(store.latest("Widget").unwrap().is_none());

        let written = store.create(new_checkpoint(None)).unwrap();
        let loaded = store.latest("Widget").unwrap().unwrap();
        assert_eq!(loaded, written);
        assert_eq!(store.subjects().unwrap(), vec!["Widget".to_string()]);
    }

    #[test]
    fn test_history_is_newest_first() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();

        let first = store.create(new_checkpoint(None)).unwrap();
        let second = store.create(new_checkpoint(Some(first.id))).unwrap();
        let third = store.create(new_checkpoint(Some(second.id))).unwrap();

        let ids: Vec<_> = store.history("Widget").unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert!(third.created_at > second.created_at);
    }

    #[test]
    fn test_stale_fence_is_rejected() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();

        let first = store.create(new_checkpoint(None)).unwrap();
        let err = store.create(new_checkpoint(None)).unwrap_err();
        assert!(matches!(err, Error::CheckpointConflict { found: Some(id), .. } if id == first.id));
        assert_eq!(store.history("Widget").unwrap().len(), 1);
    }

    #[test]
    fn test_tampered_file_is_malformed() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();
        let written = store.create(new_checkpoint(None)).unwrap();

        let path = dir.path().join("Widget").join(file_name(&written));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"0000\n{}").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let err = store.latest("Widget").unwrap_err();
        assert!(matches!(err, Error::MalformedCheckpoint { .. }));
    }

    #[test]
    fn test_subject_names_are_checked() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();
        assert!(matches!(store.latest("../etc"), Err(Error::InvalidConfig(_))));
        assert!(matches!(store.latest(""), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_file_name_round_trip() {
        let checkpoint = new_checkpoint(None).into_checkpoint(Uuid::new_v4(), truncate_micros(Utc::now()));
        let path = PathBuf::from(file_name(&checkpoint));
        assert_eq!(
            parse_file_name(&path),
            Some((checkpoint.created_at, checkpoint.id))
        );
    }
}
