//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot open {what} '{path}': {source}")]
    Open {
        what: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Truncated frame at end of input: got {got} of {expected} bytes")]
    TruncatedFrame { got: usize, expected: usize },

    #[error("Malformed OSC packet: {0}")]
    Osc(String),

    #[error("Pipeline stage '{0}' stopped unexpectedly")]
    StageStopped(&'static str),

    #[error("Media error: {0}")]
    Media(#[from] reframe_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn osc(msg: impl Into<String>) -> Self {
        Self::Osc(msg.into())
    }

    /// Whether the worker must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Osc(_) => false,
            WorkerError::Media(e) => e.is_fatal(),
            _ => true,
        }
    }
}
