//! Error types for the reframing engine.

use thiserror::Error;

/// Result type for engine operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while reframing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unexpected capture frame size: expected {expected_width}x{expected_height} ({expected_bytes} bytes), got {actual_width}x{actual_height} ({actual_bytes} bytes)")]
    UnexpectedFrameSize {
        expected_width: u32,
        expected_height: u32,
        expected_bytes: usize,
        actual_width: u32,
        actual_height: u32,
        actual_bytes: usize,
    },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Detector initialization failed: {0}")]
    DetectorInit(String),

    #[error("Detection worker is not running")]
    WorkerGone,

    #[error("Scene scoring failed: {0}")]
    SceneScore(String),

    #[error("Crop filter failed: {0}")]
    FilterFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a detector initialization error.
    pub fn detector_init(message: impl Into<String>) -> Self {
        Self::DetectorInit(message.into())
    }

    /// Create a filter failure error.
    pub fn filter_failed(message: impl Into<String>) -> Self {
        Self::FilterFailed(message.into())
    }

    /// Create a scene scoring error.
    pub fn scene_score(message: impl Into<String>) -> Self {
        Self::SceneScore(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error should stop the pipeline.
    ///
    /// Detection, scoring and filter failures only affect a single frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MediaError::DetectionFailed(_) | MediaError::SceneScore(_) | MediaError::FilterFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!MediaError::detection_failed("model timeout").is_fatal());
        assert!(!MediaError::filter_failed("bad window").is_fatal());
        assert!(MediaError::detector_init("weights missing").is_fatal());
        assert!(MediaError::WorkerGone.is_fatal());
    }
}
