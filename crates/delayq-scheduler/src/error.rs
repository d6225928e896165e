use delayq_storage::StorageError;
use thiserror::Error;

/// Errors that can occur within the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Recoverable storage failure (I/O, database, malformed record).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A due record could not be rebuilt. Stops the dispatch loop.
    #[error("Fatal storage error: {0}")]
    Reconstruction(#[source] StorageError),

    /// The delay does not fit in a timestamp.
    #[error("Invalid delay: {0:?}")]
    InvalidDelay(std::time::Duration),
}

impl SchedulerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Reconstruction(_))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
