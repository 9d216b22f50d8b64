//! Serial link lifecycle.
//!
//! # States
//!
//! ```text
//!            open ok              close
//! Closed ───────────────> Open ───────────> Closed
//!   │                      │
//!   │ open failed          │ write failed
//!   v                      v
//! Failed <─────────────────┘
//! ```
//!
//! `Closed` and `Failed` are left only by a fresh [`SerialLink::open`].

use crate::port::{PortHandle, PortOpener, SystemPortOpener};
use facegate_core::constants::DEFAULT_READ_TIMEOUT_MS;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Connection status, owned by the link rather than read off the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never opened, or closed on request.
    Closed,

    /// Device acquired; sends go to the wire.
    Open,

    /// The last open attempt or write failed.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The terminal's single connection to the door controller.
///
/// Errors are logged, never returned: the terminal keeps deciding even when
/// nothing is listening. Dropping the link closes it.
pub struct SerialLink {
    state: ConnectionState,
    port: String,
    baud: u32,
    read_timeout: Duration,
    handle: Option<PortHandle>,
    opener: Box<dyn PortOpener>,
}

impl SerialLink {
    /// Default acquisition read timeout.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(DEFAULT_READ_TIMEOUT_MS);

    /// Create a closed link that opens real serial devices.
    pub fn new() -> Self {
        Self::with_opener(SystemPortOpener)
    }

    /// Create a closed link that acquires ports through `opener`.
    pub fn with_opener(opener: impl PortOpener + 'static) -> Self {
        Self {
            state: ConnectionState::Closed,
            port: String::new(),
            baud: 0,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            handle: None,
            opener: Box::new(opener),
        }
    }

    /// Set the read timeout used when acquiring the port.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Try to acquire `port` at `baud`.
    ///
    /// An already open device is released first. Failure is logged and leaves
    /// the link in [`ConnectionState::Failed`]; it is never an error for the
    /// caller. Returns the resulting state.
    pub fn open(&mut self, port: &str, baud: u32) -> ConnectionState {
        self.close();
        self.port = port.to_string();
        self.baud = baud;

        match self.opener.open(port, baud, self.read_timeout) {
            Ok(handle) => {
                info!("Connected to {} at {} baud", port, baud);
                self.handle = Some(handle);
                self.state = ConnectionState::Open;
            }
            Err(e) => {
                error!("Could not open serial port {}: {}", port, e);
                self.state = ConnectionState::Failed;
            }
        }

        self.state
    }

    /// Write `bytes` to the device.
    ///
    /// Returns `false` without any I/O unless the link is open. A failed
    /// write releases the device and moves the link to
    /// [`ConnectionState::Failed`].
    pub fn send(&mut self, bytes: &[u8]) -> bool {
        if self.state != ConnectionState::Open {
            warn!("Cannot send {} bytes: serial link is {}", bytes.len(), self.state);
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        match handle.write_all(bytes).and_then(|()| handle.flush()) {
            Ok(()) => {
                debug!("Wrote {} bytes to {}", bytes.len(), self.port);
                true
            }
            Err(e) => {
                error!("Write to {} failed: {}", self.port, e);
                self.handle = None;
                self.state = ConnectionState::Failed;
                false
            }
        }
    }

    /// Release the device. Idempotent; a no-op unless the link is open.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Open {
            self.handle = None;
            self.state = ConnectionState::Closed;
            info!("Closed serial port {}", self.port);
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Port of the most recent open attempt.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Baud rate of the most recent open attempt.
    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLink")
            .field("state", &self.state)
            .field("port", &self.port)
            .field("baud", &self.baud)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
