//! Error types

use thiserror::Error;

/// Failures of the underlying key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn read(key: &str, source: std::io::Error) -> Self {
        StoreError::Read {
            key: key.to_string(),
            source,
        }
    }

    pub fn write(key: &str, source: std::io::Error) -> Self {
        StoreError::Write {
            key: key.to_string(),
            source,
        }
    }
}

/// Errors surfaced by timer and history operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("timer not found: {0}")]
    NotFound(String),

    #[error("invalid timer: {0}")]
    Validation(String),

    /// The history entry was written but the stopped timer was not
    #[error("completion of timer {id} was logged but the timer could not be saved: {source}")]
    CompletionNotSaved {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    /// Whether repeating the same call is safe because nothing was persisted
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Store(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
