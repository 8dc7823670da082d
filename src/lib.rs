//! # relevx
//!
//! Incremental relevance learning for structured search.
//!
//! relevx watches which results users pick after a search and learns, per
//! subject type, how much each field of the query matters. Training is
//! incremental: every cycle resumes from the subject's last checkpoint and
//! reads only the events logged since.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! relevx append --subject Song --kind query-issued --payload '{"name": "ivory"}'
//! relevx append --subject Song --kind result-selected --payload '{"name": "Ivory Tower"}' --query-id <id>
//! relevx train --subject Song --spec song-spec.json
//! relevx show --subject Song
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use relevx::prelude::*;
//! use serde_json::json;
//!
//! let storage = StorageManager::new("./data").unwrap();
//! let spec = FieldSpec::default()
//!     .with_field("name", Field::text("name"))
//!     .with_field("created", Field::date("created"));
//!
//! let trainer: RelevanceTrainer<RelevanceModel, _, _> =
//!     RelevanceTrainer::new("Song", spec.clone(), storage.event_log(), storage.checkpoints());
//! let report = trainer.run_training_cycle().unwrap();
//!
//! // Rank candidates with what was learned
//! if let Some(checkpoint) = report.checkpoint {
//!     let ranked = spec.rank(
//!         &json!({"name": "ivory"}),
//!         vec![json!({"name": "Ivory Tower"}), json!({"name": "Nostrum"})],
//!         &checkpoint.forecast,
//!     );
//!     println!("best match: {}", ranked[0].candidate);
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - `relevx-core` - events, checkpoints and the storage contracts
//! - `relevx-similarity` - fields, field specs and similarity scoring
//! - `relevx-storage` - file-backed event log and checkpoint store
//! - `relevx-trainer` - the trainable model capability and training cycle

// Re-export core types
pub use relevx_core::{
    Breadcrumb, Checkpoint, CheckpointStore, Event, EventKind, EventLog, EventMarker, Forecast,
    MemoryCheckpointStore, MemoryEventLog, NewCheckpoint, NewEvent,
    Error, Result,
};

// Re-export similarity
pub use relevx_similarity::{
    BoundSpec, Comparator, DateScoring, Field, FieldKind, FieldScores, FieldSpec, RankedCandidate, SchemaError,
};

// Re-export storage
pub use relevx_storage::{FileCheckpointStore, FileEventLog, StorageManager};

// Re-export trainer
pub use relevx_trainer::{
    build_training_pairs, run_training_cycle, AdvancePolicy, CycleReport, CycleStage, NetworkContext,
    RelevanceModel, RelevanceTrainer, TrainableModel, TrainerConfig, TrainingPair, TrainingSet,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Checkpoint, CheckpointStore, Event, EventKind, EventLog, NewEvent,
        Field, FieldSpec, DateScoring,
        StorageManager,
        RelevanceModel, RelevanceTrainer, TrainableModel, TrainerConfig, AdvancePolicy, CycleReport,
        Error, Result,
    };
}
