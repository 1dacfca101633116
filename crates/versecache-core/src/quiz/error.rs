use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("No questions available for category '{0}'")]
    InsufficientQuestions(String),

    /// The operation is not allowed in the engine's current state. A caller
    /// contract violation, never retried.
    #[error("{operation} is not valid while {state}")]
    InvalidSessionState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Content unavailable: {0}")]
    Content(#[from] CacheError),

    #[error("Progress storage error: {0}")]
    Storage(String),
}

impl QuizError {
    pub(crate) fn invalid(operation: &'static str, state: &'static str) -> Self {
        QuizError::InvalidSessionState { operation, state }
    }

    pub(crate) fn storage(e: anyhow::Error) -> Self {
        QuizError::Storage(format!("{:#}", e))
    }
}
