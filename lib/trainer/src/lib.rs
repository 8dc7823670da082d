//! # relevx Trainer
//!
//! Incremental, checkpointed relevance training.
//!
//! Each cycle resumes the subject's model from its latest checkpoint, reads
//! only the events logged since that checkpoint, turns selections into
//! training pairs, trains, and writes a new checkpoint. The model itself is
//! pluggable through [`TrainableModel`]; [`RelevanceModel`] is the default.
//!
//! ```rust
//! use relevx_core::{CheckpointStore, EventLog, MemoryCheckpointStore, MemoryEventLog, NewEvent};
//! use relevx_similarity::{Field, FieldSpec};
//! use relevx_trainer::{RelevanceModel, RelevanceTrainer};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let log = Arc::new(MemoryEventLog::new());
//! let store = Arc::new(MemoryCheckpointStore::new());
//! let query = log.append(NewEvent::query("Song", json!({"name": "ivory"}))).unwrap();
//! log.append(NewEvent::selection("Song", json!({"name": "Ivory Tower"}), &query)).unwrap();
//!
//! let spec = FieldSpec::default().with_field("name", Field::text("name"));
//! let trainer: RelevanceTrainer<RelevanceModel, _, _> =
//!     RelevanceTrainer::new("Song", spec, log, store.clone());
//!
//! let report = trainer.run_training_cycle().unwrap();
//! assert_eq!(report.pairs_trained, 1);
//! assert!(store.latest("Song").unwrap().is_some());
//! ```

pub mod model;
pub mod pairs;
pub mod context;
pub mod trainer;

pub use model::{RelevanceModel, TrainableModel, TrainingPair};
pub use pairs::{build_training_pairs, SkipReason, SkippedEvent, TrainingSet};
pub use context::{CycleStage, NetworkContext};
pub use trainer::{run_training_cycle, AdvancePolicy, CycleReport, RelevanceTrainer, TrainerConfig};
