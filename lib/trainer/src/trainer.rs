//! Training cycle orchestration
//!
//! A [`RelevanceTrainer`] drives one subject through
//! `Idle -> CheckpointLoaded -> ModelReady -> EventsFetched -> Trained -> CheckpointSaved`.
//! Every step takes a [`NetworkContext`] by value and returns the next one.

use crate::context::{CycleStage, NetworkContext};
use crate::model::TrainableModel;
use crate::pairs::build_training_pairs;
use relevx_core::{latest_marker, Checkpoint, CheckpointStore, Error, EventLog, NewCheckpoint, Result};
use relevx_similarity::FieldSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// What to do with the event marker when a cycle produced no training pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Write a checkpoint past the fetched events anyway
    #[default]
    Always,
    /// Leave the marker where it is so those events are fetched again
    OnlyWithSignal,
}

impl AdvancePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvancePolicy::Always => "always",
            AdvancePolicy::OnlyWithSignal => "only_with_signal",
        }
    }
}

impl fmt::Display for AdvancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvancePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "always" => Ok(AdvancePolicy::Always),
            "only_with_signal" => Ok(AdvancePolicy::OnlyWithSignal),
            other => Err(Error::InvalidConfig(format!("unknown advance policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub advance_policy: AdvancePolicy,
    /// Write a checkpoint even when a cycle fetched no new events
    #[serde(default)]
    pub write_when_idle: bool,
}

/// Outcome of one training cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub subject: String,
    pub events_fetched: usize,
    pub pairs_trained: usize,
    /// Selections that had no usable breadcrumb
    pub skipped: usize,
    /// Checkpoint written by this cycle, if any
    pub checkpoint: Option<Checkpoint>,
    pub cold_start: bool,
}

/// Incremental, checkpointed trainer for one subject type
pub struct RelevanceTrainer<M, L: ?Sized, S: ?Sized> {
    subject_type: String,
    field_spec: FieldSpec,
    events: Arc<L>,
    checkpoints: Arc<S>,
    config: TrainerConfig,
    _model: PhantomData<fn() -> M>,
}

impl<M, L, S> RelevanceTrainer<M, L, S>
where
    M: TrainableModel,
    L: EventLog + ?Sized,
    S: CheckpointStore + ?Sized,
{
    pub fn new(subject_type: impl Into<String>, field_spec: FieldSpec, events: Arc<L>, checkpoints: Arc<S>) -> Self {
        Self {
            subject_type: subject_type.into(),
            field_spec,
            events,
            checkpoints,
            config: TrainerConfig::default(),
            _model: PhantomData,
        }
    }

    pub fn with_config(mut self, config: TrainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn field_spec(&self) -> &FieldSpec {
        &self.field_spec
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Empty context to start a cycle from
    pub fn context(&self) -> NetworkContext<M> {
        NetworkContext::new()
    }

    /// Load the subject's most recent checkpoint, if it has one
    pub fn get_last_checkpoint(&self, ctx: NetworkContext<M>) -> Result<NetworkContext<M>> {
        let checkpoint = self.checkpoints.latest(&self.subject_type)?;
        match &checkpoint {
            Some(cp) => debug!(subject = %self.subject_type, checkpoint = %cp.id, "resuming from checkpoint"),
            None => debug!(subject = %self.subject_type, "no checkpoint, cold start"),
        }
        Ok(ctx.with_checkpoint(checkpoint))
    }

    /// Restore the model from the loaded checkpoint or build an untrained one.
    ///
    /// State that fails to restore is reported as `MalformedCheckpoint`; it
    /// never degrades into a cold start.
    pub fn get_model(&self, ctx: NetworkContext<M>) -> Result<NetworkContext<M>> {
        self.require(&ctx, CycleStage::CheckpointLoaded, "get_model")?;

        let model = match ctx.checkpoint() {
            Some(cp) => M::restore(&cp.trained_state).map_err(|e| Error::malformed(&self.subject_type, e))?,
            None => M::untrained(&self.field_spec.field_names()),
        };
        Ok(ctx.with_model(model))
    }

    /// Fetch events strictly after the loaded checkpoint's marker
    pub fn get_events(&self, ctx: NetworkContext<M>) -> Result<NetworkContext<M>> {
        self.require(&ctx, CycleStage::CheckpointLoaded, "get_events")?;

        let marker = ctx.checkpoint().and_then(|cp| cp.last_event_marker);
        let mut events = self.events.query(&self.subject_type, marker.as_ref())?;
        events.retain(|e| e.subject_type == self.subject_type && e.is_after(marker.as_ref()));
        events.sort_by_key(|e| e.timestamp);

        debug!(subject = %self.subject_type, events = events.len(), "fetched events");
        Ok(ctx.with_events(events))
    }

    /// Build pairs from the fetched events and train the model on them in one batch
    pub fn train(&self, ctx: NetworkContext<M>) -> Result<NetworkContext<M>> {
        self.require(&ctx, CycleStage::EventsFetched, "train")?;

        let training = build_training_pairs(ctx.events(), &self.field_spec);
        let (ctx, model) = ctx.take_model();
        let mut model = model.ok_or_else(|| Error::InvalidState("train called without a model".to_string()))?;

        if !training.is_empty() {
            model.train(&training.pairs)?;
        }

        debug!(
            subject = %self.subject_type,
            pairs = training.pairs.len(),
            skipped = training.skipped.len(),
            "trained"
        );
        Ok(ctx.with_trained(model, training))
    }

    /// Persist forecast and model state, fenced on the checkpoint the cycle started from.
    ///
    /// No checkpoint is written when the cycle fetched nothing (unless
    /// `write_when_idle`), or when it produced no pairs under
    /// [`AdvancePolicy::OnlyWithSignal`].
    pub fn save_checkpoint(&self, ctx: NetworkContext<M>) -> Result<NetworkContext<M>> {
        self.require(&ctx, CycleStage::Trained, "save_checkpoint")?;

        let pairs_trained = ctx.training().map_or(0, |t| t.pairs.len());
        if ctx.events().is_empty() && !self.config.write_when_idle {
            debug!(subject = %self.subject_type, "no new events, checkpoint unchanged");
            return Ok(ctx.with_saved(None));
        }
        if pairs_trained == 0 && self.config.advance_policy == AdvancePolicy::OnlyWithSignal {
            debug!(subject = %self.subject_type, "no training signal, marker left in place");
            return Ok(ctx.with_saved(None));
        }

        let model = ctx
            .model()
            .ok_or_else(|| Error::InvalidState("save_checkpoint called without a model".to_string()))?;
        let previous = ctx.checkpoint();

        let new_checkpoint = NewCheckpoint {
            subject_type: self.subject_type.clone(),
            last_event_marker: latest_marker(ctx.events()).or_else(|| previous.and_then(|cp| cp.last_event_marker)),
            trained_state: model.serialize()?,
            forecast: model.forecast(),
            fields: self.field_spec.field_names(),
            pairs_trained,
            expected_previous: previous.map(|cp| cp.id),
        };

        let saved = self.checkpoints.create(new_checkpoint)?;
        Ok(ctx.with_saved(Some(saved)))
    }

    /// Load, resume, fetch, train and save in order
    pub fn run_training_cycle(&self) -> Result<CycleReport> {
        info!(subject = %self.subject_type, "starting training cycle");

        let ctx = self.get_last_checkpoint(self.context())?;
        let ctx = self.get_model(ctx)?;
        let ctx = self.get_events(ctx)?;
        let ctx = self.train(ctx)?;
        let ctx = self.save_checkpoint(ctx)?;

        let report = CycleReport {
            subject: self.subject_type.clone(),
            events_fetched: ctx.events().len(),
            pairs_trained: ctx.training().map_or(0, |t| t.pairs.len()),
            skipped: ctx.training().map_or(0, |t| t.skipped.len()),
            checkpoint: ctx.saved().cloned(),
            cold_start: ctx.is_cold_start(),
        };

        info!(
            subject = %report.subject,
            events = report.events_fetched,
            pairs = report.pairs_trained,
            skipped = report.skipped,
            checkpoint = ?report.checkpoint.as_ref().map(|cp| cp.id),
            "training cycle finished"
        );
        Ok(report)
    }

    fn require(&self, ctx: &NetworkContext<M>, stage: CycleStage, step: &str) -> Result<()> {
        if ctx.stage() < stage {
            return Err(Error::InvalidState(format!(
                "{} needs stage {:?}, context is at {:?}",
                step,
                stage,
                ctx.stage()
            )));
        }
        Ok(())
    }
}

/// Run one cycle for `subject_type` with a default-configured trainer
pub fn run_training_cycle<M, L, S>(
    subject_type: &str,
    field_spec: &FieldSpec,
    events: Arc<L>,
    checkpoints: Arc<S>,
) -> Result<CycleReport>
where
    M: TrainableModel,
    L: EventLog + ?Sized,
    S: CheckpointStore + ?Sized,
{
    RelevanceTrainer::<M, L, S>::new(subject_type, field_spec.clone(), events, checkpoints).run_training_cycle()
}
