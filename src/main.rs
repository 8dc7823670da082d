use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};
use relevx_core::{Checkpoint, CheckpointStore, EventKind, EventLog, EventMarker, NewEvent};
use relevx_similarity::FieldSpec;
use relevx_storage::{FileCheckpointStore, FileEventLog, StorageManager};
use relevx_trainer::{AdvancePolicy, CycleReport, RelevanceModel, RelevanceTrainer, TrainerConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

type Trainer = RelevanceTrainer<RelevanceModel, FileEventLog, FileCheckpointStore>;

/// Learn which fields matter from the search results users pick
#[derive(Parser, Debug)]
#[command(name = "relevx")]
#[command(about = "Incremental relevance learning", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a training cycle for one subject
    Train {
        #[arg(short, long)]
        subject: String,

        /// JSON file holding the field spec
        #[arg(long)]
        spec: PathBuf,

        /// Marker policy when a cycle produces no training pairs
        #[arg(long, default_value_t = AdvancePolicy::Always)]
        advance_policy: AdvancePolicy,

        /// Write a checkpoint even when no new events arrived
        #[arg(long)]
        write_when_idle: bool,

        /// Re-run the cycle every N seconds until interrupted
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Print the latest checkpoint (or the whole history) for a subject
    Show {
        #[arg(short, long)]
        subject: String,

        #[arg(long)]
        history: bool,
    },

    /// Append an event to the log
    Append {
        #[arg(short, long)]
        subject: String,

        /// query-issued or result-selected
        #[arg(long)]
        kind: EventKind,

        /// Event payload as JSON
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Id of the query event a selection answers
        #[arg(long)]
        query_id: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG directives refine --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting relevx v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", args.data_dir);

    let storage = StorageManager::new(&args.data_dir)?;

    match args.command {
        Command::Train {
            subject,
            spec,
            advance_policy,
            write_when_idle,
            interval_secs,
        } => {
            let field_spec = load_spec(&spec)?;
            let config = TrainerConfig {
                advance_policy,
                write_when_idle,
            };
            let trainer = Arc::new(
                Trainer::new(subject, field_spec, storage.event_log(), storage.checkpoints()).with_config(config),
            );

            match interval_secs {
                None => print_report(&run_cycle(trainer).await?)?,
                Some(secs) => run_periodically(trainer, Duration::from_secs(secs.max(1))).await,
            }
        }
        Command::Show { subject, history } => {
            let store = storage.checkpoints();
            let checkpoints = if history {
                store.history(&subject)?
            } else {
                store.latest(&subject)?.into_iter().collect()
            };

            if checkpoints.is_empty() {
                println!("no checkpoints for subject '{}'", subject);
            }
            for checkpoint in &checkpoints {
                println!("{}", serde_json::to_string_pretty(&CheckpointSummary::from(checkpoint))?);
            }
        }
        Command::Append {
            subject,
            kind,
            payload,
            query_id,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&payload).context("payload is not valid JSON")?;
            let log = storage.event_log();

            let event = match (kind, query_id) {
                (EventKind::QueryIssued, None) => NewEvent::query(subject, payload),
                (EventKind::QueryIssued, Some(_)) => bail!("--query-id only applies to result-selected events"),
                (EventKind::ResultSelected, None) => NewEvent::orphan_selection(subject, payload),
                (EventKind::ResultSelected, Some(id)) => {
                    let query = log
                        .query(&subject, None)?
                        .into_iter()
                        .find(|e| e.id == id && e.kind == EventKind::QueryIssued)
                        .with_context(|| format!("no query-issued event {} for subject '{}'", id, subject))?;
                    NewEvent::selection(subject, payload, &query)
                }
            };

            let event = log.append(event)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}

fn load_spec(path: &Path) -> anyhow::Result<FieldSpec> {
    let data = std::fs::read_to_string(path).with_context(|| format!("cannot read spec {}", path.display()))?;
    let spec: FieldSpec = serde_json::from_str(&data).with_context(|| format!("invalid spec {}", path.display()))?;
    spec.validate()?;
    Ok(spec)
}

async fn run_cycle(trainer: Arc<Trainer>) -> anyhow::Result<CycleReport> {
    let report = tokio::task::spawn_blocking(move || trainer.run_training_cycle()).await??;
    Ok(report)
}

/// Re-run the cycle on a fixed interval; a failed cycle is retried on the next tick
async fn run_periodically(trainer: Arc<Trainer>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    info!("Training every {:?}, press Ctrl-C to stop", period);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(trainer.clone()).await {
                    error!(error = %e, "training cycle failed");
                }
            }
        }
    }

    info!("Shutting down...");
}

fn print_report(report: &CycleReport) -> anyhow::Result<()> {
    let output = ReportSummary {
        subject: &report.subject,
        cold_start: report.cold_start,
        events_fetched: report.events_fetched,
        pairs_trained: report.pairs_trained,
        skipped: report.skipped,
        checkpoint: report.checkpoint.as_ref().map(CheckpointSummary::from),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Serialize)]
struct ReportSummary<'a> {
    subject: &'a str,
    cold_start: bool,
    events_fetched: usize,
    pairs_trained: usize,
    skipped: usize,
    checkpoint: Option<CheckpointSummary<'a>>,
}

/// A checkpoint without its opaque model state
#[derive(Serialize)]
struct CheckpointSummary<'a> {
    id: Uuid,
    subject_type: &'a str,
    created_at: DateTime<Utc>,
    last_event_marker: Option<EventMarker>,
    pairs_trained: usize,
    fields: &'a [String],
    ranked_fields: Vec<(&'a str, f32)>,
    state_bytes: usize,
}

impl<'a> From<&'a Checkpoint> for CheckpointSummary<'a> {
    fn from(checkpoint: &'a Checkpoint) -> Self {
        Self {
            id: checkpoint.id,
            subject_type: &checkpoint.subject_type,
            created_at: checkpoint.created_at,
            last_event_marker: checkpoint.last_event_marker,
            pairs_trained: checkpoint.pairs_trained,
            fields: &checkpoint.fields,
            ranked_fields: checkpoint.ranked_fields(),
            state_bytes: checkpoint.trained_state.len(),
        }
    }
}
