//! File-backed event log and checkpoint store for relevx

pub mod event_log;
pub mod checkpoint_store;
pub mod manager;

pub use event_log::FileEventLog;
pub use checkpoint_store::FileCheckpointStore;
pub use manager::StorageManager;
