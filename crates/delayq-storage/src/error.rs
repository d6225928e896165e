use chrono::{DateTime, Utc};
use delayq_core::{FactoryError, JobId};
use thiserror::Error;

/// Errors that can occur within a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Reading or writing the state file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A job state or the state file could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record decoded, but its state is not a field-keyed object.
    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: JobId, reason: String },

    /// The factory could not rebuild a persisted job. Fatal for the dispatch loop.
    #[error("Cannot reconstruct job {id}: {source}")]
    Reconstruction {
        id: JobId,
        #[source]
        source: FactoryError,
    },

    /// Table names are interpolated into SQL and must be plain identifiers.
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    /// Due times are stored as four-digit-year text; later or negative years
    /// would break the ordering of the due query.
    #[error("Due time {0} is outside years 0000-9999")]
    DueTimeOutOfRange(DateTime<Utc>),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// True when retrying cannot help: the record needs code that is not deployed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Reconstruction { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
