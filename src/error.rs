//! Error types for the gesture pipeline.

use thiserror::Error;

/// Errors raised by the capture, recognition and driver layers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureError {
    /// The capture device could not be opened or permission was refused.
    #[error("camera access denied: {message}")]
    DeviceAccessDenied { message: String },

    /// The inference models could not be fetched or loaded.
    #[error("model load failed: {message}")]
    ModelLoadFailure { message: String },

    /// A single recognition call failed.
    #[error("recognition failed: {message}")]
    RecognitionTransientFailure { message: String },

    /// The frame is not decodable yet (zero width or height). Kept for
    /// classification: the recognizer reports such frames as `Ok(None)`
    /// and the driver skips them, so neither raises this.
    #[error("frame not ready ({width}x{height})")]
    InvalidFrameState { width: u32, height: u32 },

    /// Video-mode timestamps went backwards.
    #[error("timestamp {timestamp_ms}ms precedes previous {previous_ms}ms")]
    NonMonotonicTimestamp { previous_ms: u64, timestamp_ms: u64 },
}

impl GestureError {
    pub fn device(message: impl Into<String>) -> Self {
        Self::DeviceAccessDenied {
            message: message.into(),
        }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::ModelLoadFailure {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::RecognitionTransientFailure {
            message: message.into(),
        }
    }

    /// Returns true if the error ends the current session with no retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeviceAccessDenied { .. }
                | Self::ModelLoadFailure { .. }
                | Self::NonMonotonicTimestamp { .. }
        )
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, GestureError>;
