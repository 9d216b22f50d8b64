//! Error types for the terminal layer.

use facegate_biometric::BiometricError;
use std::path::PathBuf;

/// Result type alias for terminal operations.
pub type Result<T> = std::result::Result<T, TerminalError>;

/// Errors raised while setting the terminal up or enrolling people.
///
/// Decision attempts never fail with these; see [`PipelineError`].
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// Configuration file could not be parsed.
    #[error("Invalid configuration file {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration parsed but holds an unusable value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Biometric(#[from] BiometricError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerminalError {
    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// No probe image could be obtained from the capture source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The source has produced nothing yet.
    #[error("No capture available")]
    Empty,

    /// The capture file is absent.
    #[error("Capture file {} not found", .0.display())]
    Missing(PathBuf),

    /// The capture file exists but is not a readable image.
    #[error("Cannot decode capture {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
}

/// Why a decision attempt did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Another attempt is still in progress.
    #[error("A decision attempt is already in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let error = TerminalError::config("baud must be non-zero");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: baud must be non-zero"
        );
    }

    #[test]
    fn test_capture_error_display() {
        let error = CaptureError::Missing(PathBuf::from("capture.jpg"));
        assert_eq!(error.to_string(), "Capture file capture.jpg not found");
    }

    #[test]
    fn test_busy_display() {
        assert_eq!(
            PipelineError::Busy.to_string(),
            "A decision attempt is already in progress"
        );
    }
}
