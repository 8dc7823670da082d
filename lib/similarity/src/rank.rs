//! Ranking candidates with a learned forecast
//!
//! Scores every candidate against one bound query and orders them by the
//! forecast-weighted mean of their per-field scores.

use crate::spec::{FieldScores, FieldSpec};
use relevx_core::Forecast;
use serde_json::Value;

/// A candidate with its per-field and combined scores
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: Value,
    /// Forecast-weighted score
    pub score: f32,
    /// Unweighted per-field similarities
    pub field_scores: FieldScores,
}

impl FieldSpec {
    /// Rank `candidates` against `query`, best first
    pub fn rank(&self, query: &Value, candidates: Vec<Value>, forecast: &Forecast) -> Vec<RankedCandidate> {
        let bound = self.bind(query);
        let mut results: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let field_scores = bound.score(&candidate);
                let score = self.weighted_score(&field_scores, forecast);
                RankedCandidate {
                    candidate,
                    score,
                    field_scores,
                }
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        results
    }
}
