//! Field specs
//!
//! A [`FieldSpec`] groups named [`Field`]s. Binding it to a query object
//! yields a [`BoundSpec`] that scores candidate objects field by field.

use crate::field::{Comparator, Field, FieldKind};
use relevx_core::Forecast;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-field similarity scores, keyed by field name
pub type FieldScores = HashMap<String, f32>;

fn default_version() -> u32 {
    1
}

/// Named collection of fields defining how two objects are compared
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    /// Spec version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    /// Fields keyed by name
    pub fields: HashMap<String, Field>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl FieldSpec {
    pub fn new(fields: HashMap<String, Field>) -> Self {
        Self {
            version: 1,
            fields,
        }
    }

    /// Add or replace a field
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Check that the spec can be used
    /// - at least one field
    /// - no empty path segments
    /// - date scales are positive and finite
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptySpec);
        }

        for (name, field) in &self.fields {
            if field.path.split('.').any(str::is_empty) {
                return Err(SchemaError::InvalidPath(name.clone()));
            }
            if let FieldKind::Date { scale_ms, .. } = field.kind {
                if !(scale_ms.is_finite() && scale_ms > 0.0) {
                    return Err(SchemaError::InvalidScale(name.clone()));
                }
            }
        }

        Ok(())
    }

    /// Field names in a deterministic order (sorted)
    pub fn sorted_field_names(&self) -> Vec<&String> {
        let mut names: Vec<_> = self.fields.keys().collect();
        names.sort();
        names
    }

    /// Owned, sorted field names
    pub fn field_names(&self) -> Vec<String> {
        self.sorted_field_names().into_iter().cloned().collect()
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Bind every field to the query attribute of the same name.
    ///
    /// Missing query attributes bind to an absent value instead of failing.
    pub fn bind(&self, query: &Value) -> BoundSpec {
        let comparators = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.similarity(query.get(name))))
            .collect();
        BoundSpec { comparators }
    }

    /// Per-field similarity of `candidate` to `query`
    ///
    /// Binds afresh on every call; bind once with [`FieldSpec::bind`] when
    /// scoring many candidates against the same query.
    pub fn similarity(&self, query: &Value, candidate: &Value) -> FieldScores {
        self.bind(query).score(candidate)
    }

    /// Which fields the query supplied: 1.0 when present, 0.0 when absent
    pub fn query_features(&self, query: &Value) -> FieldScores {
        self.fields
            .keys()
            .map(|name| {
                let present = query.get(name).map_or(false, |v| !v.is_null());
                (name.clone(), if present { 1.0 } else { 0.0 })
            })
            .collect()
    }

    /// Forecast-weighted mean of a score vector
    ///
    /// Fields without a forecast weight count with weight 0. When no field
    /// has positive weight the plain mean is returned.
    pub fn weighted_score(&self, scores: &FieldScores, forecast: &Forecast) -> f32 {
        if scores.is_empty() {
            return 0.0;
        }

        let mut total = 0.0f32;
        let mut weight_sum = 0.0f32;
        for (name, score) in scores {
            let weight = forecast.get(name).copied().unwrap_or(0.0).max(0.0);
            total += score * weight;
            weight_sum += weight;
        }

        if weight_sum > 0.0 {
            (total / weight_sum).clamp(0.0, 1.0)
        } else {
            (scores.values().sum::<f32>() / scores.len() as f32).clamp(0.0, 1.0)
        }
    }
}

/// A spec bound to one query, reusable across candidates
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSpec {
    comparators: HashMap<String, Comparator>,
}

impl BoundSpec {
    /// Score a candidate; the result has exactly the spec's field names as keys
    pub fn score(&self, candidate: &Value) -> FieldScores {
        self.comparators
            .iter()
            .map(|(name, comparator)| (name.clone(), comparator.score(candidate)))
            .collect()
    }

    pub fn comparator(&self, name: &str) -> Option<&Comparator> {
        self.comparators.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.comparators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.comparators.is_empty()
    }
}

/// Errors that can occur during spec validation
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Field spec cannot be empty")]
    EmptySpec,

    #[error("Field '{0}' has an invalid path")]
    InvalidPath(String),

    #[error("Field '{0}' has a non-positive date scale")]
    InvalidScale(String),
}
