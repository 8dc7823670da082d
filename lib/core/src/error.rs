use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Checkpoint store or event log could not be reached or failed an I/O call.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The stored model state for a subject cannot be restored.
    #[error("Malformed checkpoint for subject '{subject}': {reason}")]
    MalformedCheckpoint { subject: String, reason: String },

    /// Another writer replaced the latest checkpoint since it was read.
    #[error("Checkpoint conflict for subject '{subject}': expected {expected:?}, found {found:?}")]
    CheckpointConflict {
        subject: String,
        expected: Option<Uuid>,
        found: Option<Uuid>,
    },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    pub fn malformed(subject: &str, reason: impl ToString) -> Self {
        Error::MalformedCheckpoint {
            subject: subject.to_string(),
            reason: reason.to_string(),
        }
    }
}
