use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A persisted record could not be turned back into a job.
///
/// Both variants point at a mismatch between the code that scheduled the job
/// and the code now polling it, so retrying never helps.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// No constructor is registered for the persisted type tag.
    #[error("unknown job kind: {kind}")]
    UnknownKind { kind: String },

    /// The payload does not match the fields declared by the variant.
    #[error("invalid payload for job kind {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
