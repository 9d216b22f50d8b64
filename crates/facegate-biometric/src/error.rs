//! Error types for matching and enrollment.

use facegate_core::ValidationError;
use std::path::{Path, PathBuf};

/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, BiometricError>;

/// A reference image that could not be decoded.
///
/// Kept alongside the identity it belongs to so a scan can skip the entry
/// and carry on with the rest of the gallery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unreadable reference image {}: {message}", path.display())]
pub struct DataError {
    pub path: PathBuf,
    pub message: String,
}

impl DataError {
    pub fn new(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }
}

/// Errors raised while enrolling or loading references.
#[derive(Debug, thiserror::Error)]
pub enum BiometricError {
    /// The enrollment name was rejected; nothing was written.
    #[error("Invalid enrollment name: {0}")]
    Validation(#[from] ValidationError),

    /// Nothing to enroll.
    #[error("Cannot enroll an empty image")]
    EmptyImage,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_display() {
        let error = DataError::new("db/bob.jpg", "invalid JPEG marker");
        assert_eq!(
            error.to_string(),
            "Unreadable reference image db/bob.jpg: invalid JPEG marker"
        );
    }

    #[test]
    fn test_validation_error_converts() {
        let error = BiometricError::from(ValidationError::EmptyName);
        assert!(matches!(error, BiometricError::Validation(_)));
    }
}
