//! Checkpoint records
//!
//! A checkpoint is a snapshot of learning progress for one subject. Once
//! written it is never mutated; a newer checkpoint supersedes it.

use crate::event::EventMarker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Estimated relevance weight per field name
pub type Forecast = BTreeMap<String, f32>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub id: Uuid,
    pub subject_type: String,
    /// Most recent event incorporated; `None` if no event was ever seen
    pub last_event_marker: Option<EventMarker>,
    /// Opaque state understood only by the trainable model
    pub trained_state: Vec<u8>,
    pub forecast: Forecast,
    /// Field names that were assessed
    #[serde(default)]
    pub fields: Vec<String>,
    /// Training pairs that went into this step
    #[serde(default)]
    pub pairs_trained: usize,
    pub created_at: DateTime<Utc>,
}

/// A checkpoint about to be written.
///
/// `expected_previous` is the id of the checkpoint the writer started from
/// (`None` on a cold start). Stores reject the write when the subject's
/// latest checkpoint no longer matches it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCheckpoint {
    pub subject_type: String,
    pub last_event_marker: Option<EventMarker>,
    pub trained_state: Vec<u8>,
    pub forecast: Forecast,
    pub fields: Vec<String>,
    pub pairs_trained: usize,
    pub expected_previous: Option<Uuid>,
}

impl NewCheckpoint {
    pub fn into_checkpoint(self, id: Uuid, created_at: DateTime<Utc>) -> Checkpoint {
        Checkpoint {
            id,
            subject_type: self.subject_type,
            last_event_marker: self.last_event_marker,
            trained_state: self.trained_state,
            forecast: self.forecast,
            fields: self.fields,
            pairs_trained: self.pairs_trained,
            created_at,
        }
    }
}

impl Checkpoint {
    /// Field names ordered by forecast weight, heaviest first
    pub fn ranked_fields(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .forecast
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewCheckpoint {
        NewCheckpoint {
            subject_type: "Widget".to_string(),
            last_event_marker: None,
            trained_state: vec![1, 2, 3],
            forecast: Forecast::from([("name".to_string(), 0.7), ("created".to_string(), 0.3)]),
            fields: vec!["created".to_string(), "name".to_string()],
            pairs_trained: 3,
            expected_previous: None,
        }
    }

    #[test]
    fn test_into_checkpoint_keeps_payload() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let checkpoint = sample().into_checkpoint(id, now);

        assert_eq!(checkpoint.id, id);
        assert_eq!(checkpoint.created_at, now);
        assert_eq!(checkpoint.trained_state, vec![1, 2, 3]);
        assert_eq!(checkpoint.pairs_trained, 3);
    }

    #[test]
    fn test_ranked_fields() {
        let checkpoint = sample().into_checkpoint(Uuid::new_v4(), Utc::now());
        let ranked = checkpoint.ranked_fields();
        assert_eq!(ranked[0].0, "name");
        assert_eq!(ranked[1].0, "created");
    }

    #[test]
    fn test_serde_roundtrip() {
        let checkpoint = sample().into_checkpoint(Uuid::new_v4(), Utc::now());
        let json = serde_json::to_string(&checkpoint).unwrap();
        let parsed: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(checkpoint, parsed);
    }
}
