//! The trainable model capability
//!
//! The trainer never looks inside a model. It creates or restores one,
//! feeds it training pairs, and persists what `forecast` and `serialize`
//! return. [`RelevanceModel`] is the implementation shipped with relevx.

use relevx_core::{Error, Forecast, Result};
use relevx_similarity::FieldScores;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of training signal derived from a query/selection pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    /// Query-derived features: 1.0 for each field the query supplied
    pub input: FieldScores,
    /// Similarity of the selected result to the query, per field
    pub output: FieldScores,
}

/// A model that can be trained incrementally and resumed from opaque state
pub trait TrainableModel: Sized + Send {
    /// Fresh model for a cold start
    fn untrained(fields: &[String]) -> Self;

    /// Rebuild a model from state produced by [`TrainableModel::serialize`]
    fn restore(state: &[u8]) -> Result<Self>;

    fn train(&mut self, pairs: &[TrainingPair]) -> Result<()>;

    /// Current estimate of each field's relevance weight
    fn forecast(&self) -> Forecast;

    fn serialize(&self) -> Result<Vec<u8>>;
}

const STATE_VERSION: u32 = 1;
const DEFAULT_LEARNING_RATE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
struct FieldEstimate {
    mean: f32,
    observations: u64,
}

/// Running estimate of how closely selected results match each query field.
///
/// For every pair where the query supplied a field, the field's estimate
/// moves toward the pair's similarity score: a plain mean for the first
/// `1 / learning_rate` observations, an exponentially weighted mean after
/// that. The forecast is the estimates normalized to sum to 1; fields that
/// users' selections consistently match score heavier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceModel {
    version: u32,
    learning_rate: f32,
    fields: BTreeMap<String, FieldEstimate>,
}

impl RelevanceModel {
    pub fn with_learning_rate(fields: &[String], learning_rate: f32) -> Result<Self> {
        if !(learning_rate > 0.0 && learning_rate <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be in (0, 1], got {}",
                learning_rate
            )));
        }
        Ok(Self {
            version: STATE_VERSION,
            learning_rate,
            fields: fields
                .iter()
                .map(|name| (name.clone(), FieldEstimate::default()))
                .collect(),
        })
    }

    /// Total observations across all fields
    pub fn observations(&self) -> u64 {
        self.fields.values().map(|f| f.observations).sum()
    }

    fn observe(&mut self, field: &str, score: f32) {
        let estimate = self.fields.entry(field.to_string()).or_default();
        estimate.observations += 1;
        let rate = self.learning_rate.max(1.0 / estimate.observations as f32);
        estimate.mean += rate * (score - estimate.mean);
    }
}

impl TrainableModel for RelevanceModel {
    fn untrained(fields: &[String]) -> Self {
        Self {
            version: STATE_VERSION,
            learning_rate: DEFAULT_LEARNING_RATE,
            fields: fields
                .iter()
                .map(|name| (name.clone(), FieldEstimate::default()))
                .collect(),
        }
    }

    fn restore(state: &[u8]) -> Result<Self> {
        let model: RelevanceModel =
            bincode::deserialize(state).map_err(|e| Error::Model(format!("cannot decode model state: {}", e)))?;
        if model.version != STATE_VERSION {
            return Err(Error::Model(format!("unsupported model state version {}", model.version)));
        }
        Ok(model)
    }

    fn train(&mut self, pairs: &[TrainingPair]) -> Result<()> {
        for pair in pairs {
            for (field, score) in &pair.output {
                let supplied = pair.input.get(field).copied().unwrap_or(0.0) > 0.0;
                if supplied && score.is_finite() {
                    self.observe(field, score.clamp(0.0, 1.0));
                }
            }
        }
        Ok(())
    }

    fn forecast(&self) -> Forecast {
        let total: f32 = self
            .fields
            .values()
            .filter(|f| f.observations > 0)
            .map(|f| f.mean)
            .sum();

        if total <= 0.0 {
            let uniform = 1.0 / self.fields.len().max(1) as f32;
            return self.fields.keys().map(|name| (name.clone(), uniform)).collect();
        }

        self.fields
            .iter()
            .map(|(name, f)| {
                let weight = if f.observations > 0 { f.mean / total } else { 0.0 };
                (name.clone(), weight)
            })
            .collect()
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Model(format!("cannot encode model state: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<String> {
        vec!["created".to_string(), "name".to_string()]
    }

    fn pair(name: f32, created: f32, created_supplied: bool) -> TrainingPair {
        TrainingPair {
            input: FieldScores::from([
                ("name".to_string(), 1.0),
                ("created".to_string(), if created_supplied { 1.0 } else { 0.0 }),
            ]),
            output: FieldScores::from([("name".to_string(), name), ("created".to_string(), created)]),
        }
    }

    #[test]
    fn test_untrained_forecast_is_uniform() {
        let forecast = RelevanceModel::untrained(&fields()).forecast();
        assert_eq!(forecast.len(), 2);
        assert!(forecast.values().all(|w| (w - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_training_shifts_weight_to_matching_field() {
        let mut model = RelevanceModel::untrained(&fields());
        model.train(&[pair(0.9, 0.1, true), pair(0.8, 0.2, true)]).unwrap();

        let forecast = model.forecast();
        assert!(forecast["name"] > forecast["created"]);
        let sum: f32 = forecast.values().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(model.observations(), 4);
    }

    #[test]
    fn test_fields_absent_from_query_are_not_observed() {
        let mut model = RelevanceModel::untrained(&fields());
        model.train(&[pair(0.6, 1.0, false)]).unwrap();

        let forecast = model.forecast();
        assert!((forecast["name"] - 1.0).abs() < 1e-6);
        assert_eq!(forecast["created"], 0.0);
    }

    #[test]
    fn test_restore_keeps_forecast() {
        let mut model = RelevanceModel::untrained(&fields());
        model.train(&[pair(0.7, 0.3, true)]).unwrap();

        let restored = RelevanceModel::restore(&TrainableModel::serialize(&model).unwrap()).unwrap();
        assert_eq!(restored.forecast(), model.forecast());
        assert_eq!(restored, model);
    }

    #[test]
    fn test_restore_rejects_garbage() {
        assert!(matches!(RelevanceModel::restore(b"not a model"), Err(Error::Model(_))));
        assert!(matches!(RelevanceModel::restore(&[]), Err(Error::Model(_))));
    }

    #[test]
    fn test_learning_rate_bounds() {
        assert!(RelevanceModel::with_learning_rate(&fields(), 0.0).is_err());
        assert!(RelevanceModel::with_learning_rate(&fields(), 1.5).is_err());
        assert!(RelevanceModel::with_learning_rate(&fields(), 0.2).is_ok());
    }
}
