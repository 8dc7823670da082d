use crate::checkpoint_store::FileCheckpointStore;
use crate::event_log::{unavailable, FileEventLog};
use relevx_core::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Opens the event log and checkpoint store under one data directory
///
/// ```text
/// <data_dir>/events.log
/// <data_dir>/checkpoints/<subject>/<created_at>-<id>.checkpoint
/// ```
pub struct StorageManager {
    data_dir: PathBuf,
    events: Arc<FileEventLog>,
    checkpoints: Arc<FileCheckpointStore>,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(unavailable)?;

        let events = Arc::new(FileEventLog::open(data_dir.join("events.log"))?);
        let checkpoints = Arc::new(FileCheckpointStore::open(data_dir.join("checkpoints"))?);

        info!(
            data_dir = %data_dir.display(),
            events = events.len(),
            "storage opened"
        );
        Ok(Self {
            data_dir,
            events,
            checkpoints,
        })
    }

    #[inline]
    pub fn event_log(&self) -> Arc<FileEventLog> {
        self.events.clone()
    }

    #[inline]
    pub fn checkpoints(&self) -> Arc<FileCheckpointStore> {
        self.checkpoints.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
