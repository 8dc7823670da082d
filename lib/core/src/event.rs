//! Events consumed by the trainer.
//!
//! The event log is owned by the analytics side of the application; the
//! trainer only reads `query-issued` and `result-selected` records for one
//! subject and, in tests and tooling, appends new ones.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a tracked event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A user issued a search query against a subject
    #[serde(rename = "query-issued", alias = "search")]
    QueryIssued,
    /// A user picked one of the results of a previous query
    #[serde(rename = "result-selected", alias = "search.select")]
    ResultSelected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::QueryIssued => "query-issued",
            EventKind::ResultSelected => "result-selected",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query-issued" | "search" => Ok(EventKind::QueryIssued),
            "result-selected" | "search.select" => Ok(EventKind::ResultSelected),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

/// Back-reference from a selection to the query that preceded it.
///
/// The query payload is embedded so a selection stays usable even when its
/// query lies before the current checkpoint marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breadcrumb {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
}

impl Breadcrumb {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_id: Some(event.id),
            kind: event.kind,
            payload: event.payload.clone(),
        }
    }
}

/// An immutable record in the event log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub subject_type: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: Value,
    /// Events leading up to this one, most recent first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl Event {
    /// The breadcrumb a selection is paired with (the first one)
    pub fn breadcrumb(&self) -> Option<&Breadcrumb> {
        self.breadcrumbs.first()
    }

    pub fn marker(&self) -> EventMarker {
        EventMarker {
            event_id: self.id,
            timestamp: self.timestamp,
        }
    }

    /// True when this event lies strictly after `marker` (always true without one)
    #[inline]
    pub fn is_after(&self, marker: Option<&EventMarker>) -> bool {
        marker.map_or(true, |m| self.timestamp > m.timestamp)
    }
}

/// An event before the log has assigned it an id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEvent {
    pub subject_type: String,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl NewEvent {
    pub fn query(subject_type: impl Into<String>, payload: Value) -> Self {
        Self {
            subject_type: subject_type.into(),
            kind: EventKind::QueryIssued,
            payload,
            breadcrumbs: Vec::new(),
        }
    }

    /// A selection of `payload` that answers the already logged `query`
    pub fn selection(subject_type: impl Into<String>, payload: Value, query: &Event) -> Self {
        Self {
            subject_type: subject_type.into(),
            kind: EventKind::ResultSelected,
            payload,
            breadcrumbs: vec![Breadcrumb::from_event(query)],
        }
    }

    /// A selection with no breadcrumb at all
    pub fn orphan_selection(subject_type: impl Into<String>, payload: Value) -> Self {
        Self {
            subject_type: subject_type.into(),
            kind: EventKind::ResultSelected,
            payload,
            breadcrumbs: Vec::new(),
        }
    }

    pub fn into_event(self, id: Uuid, timestamp: DateTime<Utc>) -> Event {
        Event {
            id,
            subject_type: self.subject_type,
            kind: self.kind,
            timestamp,
            payload: self.payload,
            breadcrumbs: self.breadcrumbs,
        }
    }
}

/// Position of the most recent event a checkpoint incorporated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventMarker {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Marker of the latest event in `events`, if any
pub fn latest_marker(events: &[Event]) -> Option<EventMarker> {
    events.iter().max_by_key(|e| e.timestamp).map(Event::marker)
}

/// Timestamp for the next appended event, strictly after `last`.
///
/// Keeps the log totally ordered even when the clock does not advance
/// between two appends.
pub fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&EventKind::ResultSelected).unwrap();
        assert_eq!(json, "\"result-selected\"");

        let legacy: EventKind = serde_json::from_str("\"search.select\"").unwrap();
        assert_eq!(legacy, EventKind::ResultSelected);
        assert_eq!("search".parse::<EventKind>().unwrap(), EventKind::QueryIssued);
        assert!("click".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_selection_embeds_query() {
        let query = NewEvent::query("Song", json!({"name": "ivory"}))
            .into_event(Uuid::new_v4(), Utc::now());
        let selection = NewEvent::selection("Song", json!({"name": "Ivory Tower"}), &query);

        let crumb = selection.breadcrumbs.first().unwrap();
        assert_eq!(crumb.event_id, Some(query.id));
        assert_eq!(crumb.kind, EventKind::QueryIssued);
        assert_eq!(crumb.payload, json!({"name": "ivory"}));
    }

    #[test]
    fn test_is_after_marker() {
        let t0 = Utc::now();
        let early = NewEvent::query("Song", Value::Null).into_event(Uuid::new_v4(), t0);
        let late = NewEvent::query("Song", Value::Null)
            .into_event(Uuid::new_v4(), t0 + Duration::seconds(1));

        let marker = early.marker();
        assert!(!early.is_after(Some(&marker)));
        assert!(late.is_after(Some(&marker)));
        assert!(early.is_after(None));
    }

    #[test]
    fn test_latest_marker() {
        let t0 = Utc::now();
        let events: Vec<Event> = [2, 0, 1]
            .iter()
            .map(|s| {
                NewEvent::query("Song", Value::Null)
                    .into_event(Uuid::new_v4(), t0 + Duration::seconds(*s))
            })
            .collect();

        let marker = latest_marker(&events).unwrap();
        assert_eq!(marker.timestamp, t0 + Duration::seconds(2));
        assert!(latest_marker(&[]).is_none());
    }

    #[test]
    fn test_next_timestamp_is_strictly_increasing() {
        let future = Utc::now() + Duration::hours(1);
        let next = next_timestamp(Some(future));
        assert!(next > future);

        let a = next_timestamp(None);
        let b = next_timestamp(Some(a));
        assert!(b > a);
    }
}
