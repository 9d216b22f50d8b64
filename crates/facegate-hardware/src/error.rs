//! Error types for serial link operations.
//!
//! None of these are fatal to the terminal. [`SerialLink`](crate::SerialLink)
//! logs them and degrades to "no signal sent"; they are exposed so port
//! openers and discovery can report what went wrong.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to the serial device.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The device could not be acquired (absent, busy, permission denied).
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// A write to an open device failed.
    #[error("Write failed on {port}: {message}")]
    WriteFailed { port: String, message: String },

    /// Serial devices could not be enumerated.
    #[error("Port enumeration failed: {message}")]
    Enumeration { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new open failure error.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new write failure error.
    pub fn write_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new enumeration error.
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration {
            message: message.into(),
        }
    }
}

impl From<serialport::Error> for HardwareError {
    fn from(error: serialport::Error) -> Self {
        match error.kind() {
            serialport::ErrorKind::Io(kind) => Self::Io(std::io::Error::new(kind, error.description)),
            _ => Self::enumeration(error.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_error() {
        let error = HardwareError::open_failed("COM4", "Access is denied");
        assert!(matches!(error, HardwareError::OpenFailed { .. }));
        assert_eq!(error.to_string(), "Failed to open COM4: Access is denied");
    }

    #[test]
    fn test_write_failed_error() {
        let error = HardwareError::write_failed("/dev/ttyACM0", "device unplugged");
        assert_eq!(
            error.to_string(),
            "Write failed on /dev/ttyACM0: device unplugged"
        );
    }

    #[test]
    fn test_from_serialport_error() {
        let error = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        let converted = HardwareError::from(error);
        assert!(matches!(converted, HardwareError::Enumeration { .. }));
    }
}
