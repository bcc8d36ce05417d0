//! Error types for the worker.

use thiserror::Error;

use atci_media::MediaError;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that end a job.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    Config(#[from] atci_models::ConfigError),

    #[error("media error: {0}")]
    Media(#[from] MediaError),

    #[error("store error: {0}")]
    Store(#[from] atci_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] atci_queue::QueueError),

    #[error("invalid time: {0}")]
    Timestamp(#[from] atci_models::TimestampError),

    #[error("speech-to-text is disabled and no subtitles were found")]
    TranscriptionDisabled,

    #[error("part {part} of {base} is missing predecessor part(s) {missing:?}")]
    PartOutOfOrder {
        base: String,
        part: u32,
        missing: Vec<u32>,
    },

    #[error("concatenating part {part} onto the master failed: {source}")]
    ConcatFailed { part: u32, source: MediaError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this job ended because its cancel token fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Media(e) if e.is_cancelled())
    }
}
