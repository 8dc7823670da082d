//! Turning selection events into training pairs

use crate::model::TrainingPair;
use relevx_core::{Event, EventKind};
use relevx_similarity::FieldSpec;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Why a `result-selected` event produced no training pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The selection carries no breadcrumb
    MissingBreadcrumb,
    /// The first breadcrumb is not a `query-issued` event
    BreadcrumbNotAQuery,
    /// The breadcrumb carries no query object and its event is not in the batch
    QueryPayloadMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedEvent {
    pub event_id: Uuid,
    pub reason: SkipReason,
}

/// Pairs built from one batch of events, plus the selections that were skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub pairs: Vec<TrainingPair>,
    pub skipped: Vec<SkippedEvent>,
}

impl TrainingSet {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn skip(&mut self, event: &Event, reason: SkipReason) {
        debug!(event_id = %event.id, ?reason, "skipping selection without a usable breadcrumb");
        self.skipped.push(SkippedEvent {
            event_id: event.id,
            reason,
        });
    }
}

/// Build one pair per usable `result-selected` event.
///
/// The selection's first breadcrumb supplies the query object and the
/// selection's own payload is the candidate. Query events themselves and
/// selections without a usable breadcrumb contribute nothing. A breadcrumb
/// without an embedded query object is resolved through its `event_id`
/// against the queries in `events`.
pub fn build_training_pairs(events: &[Event], spec: &FieldSpec) -> TrainingSet {
    let mut set = TrainingSet::default();
    let queries: HashMap<Uuid, &Event> = events
        .iter()
        .filter(|e| e.kind == EventKind::QueryIssued)
        .map(|e| (e.id, e))
        .collect();

    for event in events.iter().filter(|e| e.kind == EventKind::ResultSelected) {
        let query = match event.breadcrumb() {
            None => {
                set.skip(event, SkipReason::MissingBreadcrumb);
                continue;
            }
            Some(crumb) if crumb.kind != EventKind::QueryIssued => {
                set.skip(event, SkipReason::BreadcrumbNotAQuery);
                continue;
            }
            Some(crumb) if crumb.payload.is_object() => &crumb.payload,
            Some(crumb) => match crumb
                .event_id
                .and_then(|id| queries.get(&id))
                .filter(|q| q.payload.is_object())
            {
                Some(query) => &query.payload,
                None => {
                    set.skip(event, SkipReason::QueryPayloadMissing);
                    continue;
                }
            },
        };

        set.pairs.push(TrainingPair {
            input: spec.query_features(query),
            output: spec.similarity(query, &event.payload),
        });
    }

    set
}
