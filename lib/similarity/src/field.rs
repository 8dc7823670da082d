//! Typed fields
//!
//! A [`Field`] reads one attribute out of a JSON object through a dotted
//! path and knows how to normalize and compare it. Calling
//! [`Field::similarity`] with a query value produces a [`Comparator`]: the
//! query is normalized once and the comparator can then score any number
//! of candidates.

use crate::distance::{clamp_unit, date_distance, normalize_text, number_similarity, text_similarity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_scale_ms() -> f64 {
    1.0
}

/// Direction of a date score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateScoring {
    /// Larger for instants farther apart
    Distance,
    /// 1 - distance: larger for instants closer together
    #[default]
    Proximity,
}

/// Kind of a field and its kind-specific settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Stemmed, case-insensitive bigram similarity
    Text,
    /// Instants in ms since epoch; absent or unparseable values mean "now"
    Date {
        #[serde(default)]
        scoring: DateScoring,
        /// Milliseconds that count as a full unit of distance
        #[serde(default = "default_scale_ms")]
        scale_ms: f64,
    },
    /// 1 if equal, 0 otherwise
    Exact,
    /// Relative numeric similarity
    Number,
}

/// A named attribute with a comparison kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    /// Dotted path into the candidate object, e.g. `target.data.name`
    pub path: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    pub fn new(path: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn text(path: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Text)
    }

    /// Date field with the default proximity scoring at millisecond scale
    pub fn date(path: impl Into<String>) -> Self {
        Self::date_with(path, DateScoring::default(), default_scale_ms())
    }

    pub fn date_with(path: impl Into<String>, scoring: DateScoring, scale_ms: f64) -> Self {
        Self::new(path, FieldKind::Date { scoring, scale_ms })
    }

    pub fn exact(path: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Exact)
    }

    pub fn number(path: impl Into<String>) -> Self {
        Self::new(path, FieldKind::Number)
    }

    /// Raw attribute value; `None` when missing or null
    pub fn view<'a>(&self, candidate: &'a Value) -> Option<&'a Value> {
        lookup(candidate, &self.path)
    }

    /// Kind-specific normalized form of the attribute
    pub fn serialize(&self, candidate: &Value) -> Value {
        let raw = self.view(candidate);
        match &self.kind {
            FieldKind::Text => Value::String(normalize_text(&text_of(raw))),
            FieldKind::Date { .. } => Value::from(instant_or_now(raw)),
            FieldKind::Exact => raw.cloned().unwrap_or(Value::Null),
            FieldKind::Number => raw.and_then(number_of).map(Value::from).unwrap_or(Value::Null),
        }
    }

    /// Bind `query` into a reusable comparator
    pub fn similarity(&self, query: Option<&Value>) -> Comparator {
        let query = query.filter(|v| !v.is_null());
        let path = self.path.clone();
        match &self.kind {
            FieldKind::Text => Comparator::Text {
                path,
                query: normalize_text(&text_of(query)),
            },
            FieldKind::Date { scoring, scale_ms } => {
                let now_ms = now_millis();
                Comparator::Date {
                    path,
                    reference_ms: query.and_then(instant_of).unwrap_or(now_ms),
                    now_ms,
                    scoring: *scoring,
                    scale_ms: *scale_ms,
                }
            }
            FieldKind::Exact => Comparator::Exact {
                path,
                query: query.cloned(),
            },
            FieldKind::Number => Comparator::Number {
                path,
                query: query.and_then(number_of),
            },
        }
    }
}

/// A field bound to a normalized query value
#[derive(Debug, Clone, PartialEq)]
pub enum Comparator {
    Text {
        path: String,
        query: String,
    },
    Date {
        path: String,
        reference_ms: f64,
        /// Stand-in for absent candidate dates, fixed when the query is bound
        now_ms: f64,
        scoring: DateScoring,
        scale_ms: f64,
    },
    Exact {
        path: String,
        query: Option<Value>,
    },
    Number {
        path: String,
        query: Option<f64>,
    },
}

impl Comparator {
    /// Score a candidate object in [0.0, 1.0]
    pub fn score(&self, candidate: &Value) -> f32 {
        match self {
            Comparator::Text { path, query } => {
                let candidate = normalize_text(&text_of(lookup(candidate, path)));
                text_similarity(query, &candidate)
            }
            Comparator::Date {
                path,
                reference_ms,
                now_ms,
                scoring,
                scale_ms,
            } => {
                let candidate_ms = lookup(candidate, path).and_then(instant_of).unwrap_or(*now_ms);
                let distance = date_distance(*reference_ms, candidate_ms, *scale_ms);
                match scoring {
                    DateScoring::Distance => distance,
                    DateScoring::Proximity => clamp_unit(1.0 - distance as f64),
                }
            }
            Comparator::Exact { path, query } => match (query, lookup(candidate, path)) {
                (None, None) => 1.0,
                (Some(q), Some(c)) if q == c => 1.0,
                _ => 0.0,
            },
            Comparator::Number { path, query } => {
                match (query, lookup(candidate, path).and_then(number_of)) {
                    (Some(q), Some(c)) => number_similarity(*q, c),
                    _ => 0.0,
                }
            }
        }
    }
}

/// Follow a dotted path through objects (and arrays, by index)
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|v| !v.is_null())
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Milliseconds since epoch for numbers, numeric strings and RFC 3339 strings
pub fn instant_of(value: &Value) -> Option<f64> {
    number_of(value).or_else(|| match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.timestamp_millis() as f64),
        _ => None,
    })
}

fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

fn instant_or_now(value: Option<&Value>) -> f64 {
    value.and_then(instant_of).unwrap_or_else(now_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_follows_paths() {
        let obj = json!({"target": {"data": {"name": "Stifled"}}, "tags": ["a", "b"], "gone": null});

        assert_eq!(Field::text("target.data.name").view(&obj), Some(&json!("Stifled")));
        assert_eq!(Field::exact("tags.1").view(&obj), Some(&json!("b")));
        assert_eq!(Field::text("target.missing").view(&obj), None);
        assert_eq!(Field::text("gone").view(&obj), None);
        assert_eq!(Field::text("tags.x").view(&obj), None);
    }

    #[test]
    fn test_text_serialize_normalizes() {
        let field = Field::text("name");
        assert_eq!(field.serialize(&json!({"name": "Our  Rage"})), json!("our rage"));
        assert_eq!(field.serialize(&json!({})), json!(""));
    }

    #[test]
    fn test_text_identical_value_scores_one() {
        let field = Field::text("name");
        let cmp = field.similarity(Some(&json!("Born in Dissonance")));
        assert_eq!(cmp.score(&json!({"name": "Born in Dissonance"})), 1.0);
    }

    #[test]
    fn test_text_absent_sides() {
        let field = Field::text("name");
        assert_eq!(field.similarity(None).score(&json!({})), 1.0);
        assert_eq!(field.similarity(None).score(&json!({"name": "Nostrum"})), 0.0);
        assert_eq!(field.similarity(Some(&json!("nostrum"))).score(&json!({})), 0.0);
    }

    #[test]
    fn test_date_serialize_parses_formats() {
        let field = Field::date("released");
        assert_eq!(field.serialize(&json!({"released": 1_475_798_400_000i64})), json!(1_475_798_400_000.0));
        assert_eq!(field.serialize(&json!({"released": "1475798400000"})), json!(1_475_798_400_000.0));
        assert_eq!(
            field.serialize(&json!({"released": "2016-10-07T00:00:00Z"})),
            json!(1_475_798_400_000.0)
        );
    }

    #[test]
    fn test_date_absent_falls_back_to_now() {
        let field = Field::date("released");
        let before = Utc::now().timestamp_millis() as f64;
        let value = field.serialize(&json!({"released": "not a date"})).as_f64().unwrap();
        assert!(value >= before);
    }

    #[test]
    fn test_date_absent_on_both_sides_is_stable() {
        let cmp = Field::date("created").similarity(None);
        std::thread::sleep(std::time::Duration::from_millis(3));
        assert_eq!(cmp.score(&json!({})), 1.0);
        assert_eq!(cmp.score(&json!({"created": "soon"})), 1.0);

        let distance = Field::date_with("created", DateScoring::Distance, 1.0).similarity(None);
        std::thread::sleep(std::time::Duration::from_millis(3));
        assert_eq!(distance.score(&json!({})), 0.0);
    }

    #[test]
    fn test_date_scoring_directions() {
        let t0 = json!(1_475_798_400_000i64);
        let same = json!({"released": 1_475_798_400_000i64});
        let later = json!({"released": 1_475_798_460_000i64});

        let proximity = Field::date("released").similarity(Some(&t0));
        assert_eq!(proximity.score(&same), 1.0);
        assert_eq!(proximity.score(&later), 0.0);

        let distance = Field::date_with("released", DateScoring::Distance, 1.0).similarity(Some(&t0));
        assert_eq!(distance.score(&same), 0.0);
        assert_eq!(distance.score(&later), 1.0);

        // one minute apart on a two-minute scale
        let scaled = Field::date_with("released", DateScoring::Proximity, 120_000.0).similarity(Some(&t0));
        assert!((scaled.score(&later) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_exact_and_number() {
        let exact = Field::exact("id").similarity(Some(&json!(3)));
        assert_eq!(exact.score(&json!({"id": 3})), 1.0);
        assert_eq!(exact.score(&json!({"id": 4})), 0.0);
        assert_eq!(exact.score(&json!({})), 0.0);

        let number = Field::number("price").similarity(Some(&json!(10.0)));
        assert!(number.score(&json!({"price": "11"})) > 0.9);
        assert_eq!(number.score(&json!({"price": "cheap"})), 0.0);
    }

    #[test]
    fn test_field_serde_shape() {
        let field: Field = serde_json::from_value(json!({
            "path": "created",
            "type": "date",
            "scoring": "distance"
        }))
        .unwrap();
        assert_eq!(field, Field::date_with("created", DateScoring::Distance, 1.0));

        let json = serde_json::to_value(Field::text("name")).unwrap();
        assert_eq!(json, json!({"path": "name", "type": "text"}));
    }
}
