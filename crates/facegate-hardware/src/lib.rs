//! Serial link to the door controller.
//!
//! This crate owns the one piece of hardware the terminal talks to: a serial
//! port wired to the controller that releases the door. It provides:
//!
//! - [`SerialLink`]: connection lifecycle with an explicit
//!   [`ConnectionState`] and a guarded, non-fatal `send`.
//! - [`PortOpener`]: the seam between the link and the operating system.
//!   [`SystemPortOpener`] uses the `serialport` crate; [`mock::MockPortOpener`]
//!   records traffic for tests and development without a controller attached.
//! - [`available_ports`]: serial device discovery for operators.
//! - [`open_reader`]: the receiving end, for bench monitoring.
//!
//! # Failure Policy
//!
//! Hardware trouble never stops the terminal. A port that cannot be opened
//! leaves the link in [`ConnectionState::Failed`]; every later `send` returns
//! `false` without touching the device until the orchestrator opens it again.
//!
//! ```
//! use facegate_hardware::{ConnectionState, SerialLink, mock::MockPortOpener};
//!
//! let (opener, handle) = MockPortOpener::new();
//! let mut link = SerialLink::with_opener(opener);
//!
//! assert_eq!(link.open("/dev/ttyUSB0", 115_200), ConnectionState::Open);
//! assert!(link.send(&[0xFF, 0x00, 0x00, 0x00, 0xFE]));
//! link.close();
//! assert!(!link.send(&[0xFF]));
//!
//! assert_eq!(handle.writes().len(), 1);
//! ```

pub mod error;
pub mod link;
pub mod mock;
pub mod port;

pub use error::{HardwareError, Result};
pub use link::{ConnectionState, SerialLink};
pub use port::{
    PortHandle, PortInfo, PortOpener, SystemPortOpener, available_ports, open_reader,
};
