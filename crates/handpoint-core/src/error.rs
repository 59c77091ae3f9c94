//! Session-boundary error types with suggestions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for failed session operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidConfig,
    CaptureFailed,
    DetectorFailed,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidConfig => write!(f, "INVALID_CONFIG"),
            ErrorCode::CaptureFailed => write!(f, "CAPTURE_FAILED"),
            ErrorCode::DetectorFailed => write!(f, "DETECTOR_FAILED"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// An error reported to the caller of a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerError {
    pub code: ErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for TrackerError {}

impl TrackerError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidConfig,
            message: message.into(),
            suggestion: Some("Check the tracker configuration values and try again".into()),
        }
    }

    /// The configured pointer landmark does not exist on a 21-point hand.
    pub fn landmark_index_out_of_range(index: u8) -> Self {
        Self {
            code: ErrorCode::InvalidConfig,
            message: format!("cursorLandmarkIndex {} is out of range", index),
            suggestion: Some(
                "Use a landmark index between 0 and 20 (8 = index fingertip, 9 = middle finger base)"
                    .into(),
            ),
        }
    }

    /// Create a capture failure with the underlying cause included.
    pub fn capture_failed(cause: &str) -> Self {
        Self {
            code: ErrorCode::CaptureFailed,
            message: format!("Failed to acquire capture source: {}", cause),
            suggestion: Some(
                "Check that a camera is connected and that permission to use it was granted"
                    .into(),
            ),
        }
    }

    /// The capture source did not shut down cleanly. Visuals are already gone.
    pub fn capture_release_failed(cause: &str) -> Self {
        Self {
            code: ErrorCode::CaptureFailed,
            message: format!("Failed to release capture source: {}", cause),
            suggestion: Some(
                "The session is stopped; the camera may stay busy until the process exits".into(),
            ),
        }
    }

    pub fn no_capture_source() -> Self {
        Self {
            code: ErrorCode::CaptureFailed,
            message: "No capture source attached".to_string(),
            suggestion: Some("Pass a capture source to start() or to the session builder".into()),
        }
    }

    /// Create a detector configuration failure.
    pub fn detector_failed(cause: &str) -> Self {
        Self {
            code: ErrorCode::DetectorFailed,
            message: format!("Hand detector rejected its configuration: {}", cause),
            suggestion: Some(
                "Check maxHands, modelComplexity and the confidence thresholds".into(),
            ),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: message.into(),
            suggestion: Some("This is an internal error. Please report it if it persists.".into()),
        }
    }
}
