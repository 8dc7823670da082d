//! # relevx Core
//!
//! Core types for the relevx relevance-learning pipeline.
//!
//! - [`Event`] - a tracked `query-issued` / `result-selected` record
//! - [`Checkpoint`] - a persisted snapshot of training progress for one subject
//! - [`EventLog`] / [`CheckpointStore`] - the storage contracts the trainer uses
//! - [`MemoryEventLog`] / [`MemoryCheckpointStore`] - in-memory implementations
//!
//! ## Example
//!
//! ```rust
//! use relevx_core::{EventLog, MemoryEventLog, NewEvent};
//! use serde_json::json;
//!
//! let log = MemoryEventLog::new();
//! let query = log.append(NewEvent::query("Song", json!({"name": "ivory"}))).unwrap();
//! log.append(NewEvent::selection("Song", json!({"name": "Ivory Tower"}), &query)).unwrap();
//!
//! let events = log.query("Song", Some(&query.marker())).unwrap();
//! assert_eq!(events.len(), 1);
//! ```

pub mod error;
pub mod event;
pub mod checkpoint;
pub mod store;
pub mod memory;

pub use error::{Error, Result};
pub use event::{latest_marker, next_timestamp, Breadcrumb, Event, EventKind, EventMarker, NewEvent};
pub use checkpoint::{Checkpoint, Forecast, NewCheckpoint};
pub use store::{check_fence, CheckpointStore, EventLog};
pub use memory::{MemoryCheckpointStore, MemoryEventLog};
