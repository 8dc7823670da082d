//! Contracts for the two storage collaborators the trainer runs against.
//!
//! Both are synchronous; implementations decide their own I/O and timeout
//! policy and surface failures as [`Error::StoreUnavailable`].

use crate::checkpoint::{Checkpoint, NewCheckpoint};
use crate::event::{Event, EventMarker, NewEvent};
use crate::{Error, Result};
use uuid::Uuid;

/// Append-only log of tracked events
pub trait EventLog: Send + Sync {
    /// Events for `subject_type` strictly after `after`, ordered by timestamp
    fn query(&self, subject_type: &str, after: Option<&EventMarker>) -> Result<Vec<Event>>;

    /// Append an event; the log assigns its id and timestamp
    fn append(&self, event: NewEvent) -> Result<Event>;
}

/// Per-subject history of checkpoints
pub trait CheckpointStore: Send + Sync {
    /// Most recent checkpoint by `created_at`
    fn latest(&self, subject_type: &str) -> Result<Option<Checkpoint>>;

    /// Write a new checkpoint, fenced on `expected_previous`
    fn create(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint>;

    /// All checkpoints for a subject, newest first
    fn history(&self, subject_type: &str) -> Result<Vec<Checkpoint>>;
}

/// Reject a write whose writer did not start from the current latest checkpoint
pub fn check_fence(subject_type: &str, expected: Option<Uuid>, found: Option<Uuid>) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::CheckpointConflict {
            subject: subject_type.to_string(),
            expected,
            found,
        })
    }
}
