//! Immutable accumulator threaded through a training cycle
//!
//! Each step consumes a [`NetworkContext`] and returns a new one with one
//! more slot filled. Nothing hands out a mutable reference into a context,
//! so two steps run from the same context never see each other's writes.

use crate::pairs::TrainingSet;
use relevx_core::{Checkpoint, Event};
use std::sync::Arc;

/// Where a cycle is in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleStage {
    Idle,
    CheckpointLoaded,
    ModelReady,
    EventsFetched,
    Trained,
    CheckpointSaved,
}

#[derive(Debug, Clone)]
pub struct NetworkContext<M> {
    stage: CycleStage,
    checkpoint: Option<Arc<Checkpoint>>,
    model: Option<M>,
    events: Arc<[Event]>,
    training: Option<Arc<TrainingSet>>,
    saved: Option<Arc<Checkpoint>>,
}

impl<M> Default for NetworkContext<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> NetworkContext<M> {
    pub fn new() -> Self {
        Self {
            stage: CycleStage::Idle,
            checkpoint: None,
            model: None,
            events: Arc::from(Vec::new()),
            training: None,
            saved: None,
        }
    }

    /// Record the checkpoint the cycle resumes from (`None` on a cold start)
    pub fn with_checkpoint(self, checkpoint: Option<Checkpoint>) -> Self {
        Self {
            stage: CycleStage::CheckpointLoaded,
            checkpoint: checkpoint.map(Arc::new),
            ..self
        }
    }

    pub fn with_model(self, model: M) -> Self {
        Self {
            stage: self.stage.max(CycleStage::ModelReady),
            model: Some(model),
            ..self
        }
    }

    pub fn with_events(self, events: Vec<Event>) -> Self {
        Self {
            stage: CycleStage::EventsFetched,
            events: Arc::from(events),
            ..self
        }
    }

    /// Record a trained model together with the pairs it was trained on
    pub fn with_trained(self, model: M, training: TrainingSet) -> Self {
        Self {
            stage: CycleStage::Trained,
            model: Some(model),
            training: Some(Arc::new(training)),
            ..self
        }
    }

    /// Record the checkpoint the cycle wrote, if it wrote one
    pub fn with_saved(self, saved: Option<Checkpoint>) -> Self {
        Self {
            stage: CycleStage::CheckpointSaved,
            saved: saved.map(Arc::new),
            ..self
        }
    }

    /// Move the model out, leaving the rest of the context intact
    pub fn take_model(self) -> (Self, Option<M>) {
        let model = self.model;
        (
            Self {
                model: None,
                ..self
            },
            model,
        )
    }

    #[inline]
    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_deref()
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn training(&self) -> Option<&TrainingSet> {
        self.training.as_deref()
    }

    pub fn saved(&self) -> Option<&Checkpoint> {
        self.saved.as_deref()
    }

    /// True when no checkpoint was found for the subject
    pub fn is_cold_start(&self) -> bool {
        self.stage >= CycleStage::CheckpointLoaded && self.checkpoint.is_none()
    }
}
