//! In-memory stores, used by tests and for embedding the trainer without disk.

use crate::checkpoint::{Checkpoint, NewCheckpoint};
use crate::event::{next_timestamp, Event, EventMarker, NewEvent};
use crate::store::{check_fence, CheckpointStore, EventLog};
use crate::Result;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Event log held in a timestamp-ordered vector
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the log with already stamped events
    pub fn with_events(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self {
            events: RwLock::new(events),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventLog for MemoryEventLog {
    fn query(&self, subject_type: &str, after: Option<&EventMarker>) -> Result<Vec<Event>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| e.subject_type == subject_type && e.is_after(after))
            .cloned()
            .collect())
    }

    fn append(&self, event: NewEvent) -> Result<Event> {
        let mut events = self.events.write();
        let timestamp = next_timestamp(events.last().map(|e| e.timestamp));
        let event = event.into_event(Uuid::new_v4(), timestamp);
        events.push(event.clone());
        Ok(event)
    }
}

/// Checkpoint history per subject, oldest first
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn latest(&self, subject_type: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .checkpoints
            .read()
            .get(subject_type)
            .and_then(|history| history.last())
            .cloned())
    }

    fn create(&self, checkpoint: NewCheckpoint) -> Result<Checkpoint> {
        let mut checkpoints = self.checkpoints.write();
        let history = checkpoints
            .entry(checkpoint.subject_type.clone())
            .or_default();

        let latest = history.last();
        check_fence(
            &checkpoint.subject_type,
            checkpoint.expected_previous,
            latest.map(|c| c.id),
        )?;

        // created_at must order the history even within one clock tick
        let now = Utc::now();
        let created_at = match latest {
            Some(prev) if now <= prev.created_at => prev.created_at + Duration::microseconds(1),
            _ => now,
        };

        let checkpoint = checkpoint.into_checkpoint(Uuid::new_v4(), created_at);
        history.push(checkpoint.clone());
        Ok(checkpoint)
    }

    fn history(&self, subject_type: &str) -> Result<Vec<Checkpoint>> {
        Ok(self
            .checkpoints
            .read()
            .get(subject_type)
            .map(|history| history.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Forecast;
    use crate::Error;
    use serde_json::json;

    fn new_checkpoint(subject: &str, expected_previous: Option<Uuid>) -> NewCheckpoint {
        NewCheckpoint {
            subject_type: subject.to_string(),
            last_event_marker: None,
            trained_state: Vec::new(),
            forecast: Forecast::new(),
            fields: Vec::new(),
            pairs_trained: 0,
            expected_previous,
        }
    }

    #[test]
    fn test_append_assigns_increasing_timestamps() {
        let log = MemoryEventLog::new();
        let a = log.append(NewEvent::query("Widget", json!({"name": "a"}))).unwrap();
        let b = log.append(NewEvent::query("Widget", json!({"name": "b"}))).unwrap();

        assert_ne!(a.id, b.id);
        assert!(b.timestamp > a.timestamp);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_query_filters_subject_and_marker() {
        let log = MemoryEventLog::new();
        let first = log.append(NewEvent::query("Widget", json!({}))).unwrap();
        log.append(NewEvent::query("Gadget", json!({}))).unwrap();
        let third = log.append(NewEvent::query("Widget", json!({}))).unwrap();

        let all = log.query("Widget", None).unwrap();
        assert_eq!(all.len(), 2);

        let after = log.query("Widget", Some(&first.marker())).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, third.id);
    }

    #[test]
    fn test_checkpoint_latest_and_history() {
        let store = MemoryCheckpointStore::new();
        assert!(store.latest("Widget").unwrap().is_none());

        let first = store.create(new_checkpoint("Widget", None)).unwrap();
        let second = store.create(new_checkpoint("Widget", Some(first.id))).unwrap();

        assert_eq!(store.latest("Widget").unwrap().unwrap().id, second.id);
        assert!(second.created_at > first.created_at);

        let history = store.history("Widget").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert!(store.history("Gadget").unwrap().is_empty());
    }

    #[test]
    fn test_stale_writer_is_rejected() {
        let store = MemoryCheckpointStore::new();
        store.create(new_checkpoint("Widget", None)).unwrap();

        // A second cold-start writer raced the first one
        let err = store.create(new_checkpoint("Widget", None)).unwrap_err();
        assert!(matches!(err, Error::CheckpointConflict { .. }));
        assert_eq!(store.history("Widget").unwrap().len(), 1);
    }
}
