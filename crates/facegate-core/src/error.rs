use thiserror::Error;

/// Reasons a byte sequence is not a valid decision frame.
///
/// A receiver that gets one of these must drop the bytes it was looking at
/// and scan forward for the next start marker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("No start-of-frame marker found")]
    MissingStart,

    #[error("Truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Checksum mismatch: expected {expected:#04X}, got {actual:#04X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Missing end-of-frame marker: got {found:#04X}")]
    MissingEnd { found: u8 },
}

/// Reasons an enrollment name is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name contains characters not allowed in a file name: {0}")]
    InvalidCharacters(String),

    #[error("Name is {len} bytes long, max is {max}")]
    NameTooLong { len: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Invalid frame: {0}")]
    Format(#[from] FormatError),

    // Enrollment errors
    #[error("Invalid identity: {0}")]
    Validation(#[from] ValidationError),

    // Transport errors, required by the tokio codec traits
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let error = FormatError::ChecksumMismatch {
            expected: 0xC1,
            actual: 0x00,
        };
        assert_eq!(
            error.to_string(),
            "Checksum mismatch: expected 0xC1, got 0x00"
        );
    }

    #[test]
    fn test_format_error_converts() {
        let error: Error = FormatError::MissingStart.into();
        assert!(matches!(error, Error::Format(FormatError::MissingStart)));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError::NameTooLong { len: 300, max: 255 };
        assert_eq!(error.to_string(), "Name is 300 bytes long, max is 255");
    }
}
