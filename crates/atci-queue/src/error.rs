//! Error types for the queue.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur in queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(#[from] atci_store::StoreError),

    #[error("job not found in pending queue")]
    NotFound,

    #[error("nothing is currently processing")]
    NotProcessing,

    #[error("reorder must be a permutation of the pending queue")]
    SetMismatch,
}

impl From<rusqlite::Error> for QueueError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.into())
    }
}
