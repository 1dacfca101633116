use thiserror::Error;

/// Cache-manager errors. Network-class failures never appear here: they are
/// recovered inside the load chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("No fallback payload registered for source '{0}'")]
    NoFallbackAvailable(String),

    #[error("Content source '{0}' is already registered")]
    DuplicateSource(String),

    #[error("Source '{0}' is loading a different payload type")]
    PayloadTypeMismatch(String),

    #[error("Storage error: {0}")]
    Store(String),

    /// The background load task panicked or was cancelled.
    #[error("Load of source '{source_id}' aborted: {reason}")]
    LoadAborted { source_id: String, reason: String },
}

impl From<anyhow::Error> for CacheError {
    fn from(e: anyhow::Error) -> Self {
        CacheError::Store(format!("{:#}", e))
    }
}
