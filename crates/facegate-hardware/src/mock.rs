//! Mock serial device for testing and development.
//!
//! [`MockPortOpener`] stands in for [`SystemPortOpener`](crate::SystemPortOpener)
//! and records everything the link does to the device. A paired
//! [`MockPortHandle`] inspects that record and injects failures.

use crate::error::{HardwareError, Result};
use crate::port::{PortHandle, PortOpener};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    fail_open: bool,
    fail_writes: bool,
    open_attempts: Vec<(String, u32)>,
    writes: Vec<Vec<u8>>,
    releases: usize,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Port opener that hands out in-memory devices.
///
/// # Examples
///
/// ```
/// use facegate_hardware::{PortOpener, mock::MockPortOpener};
/// use std::time::Duration;
///
/// let (opener, handle) = MockPortOpener::new();
/// handle.set_fail_open(true);
///
/// assert!(opener.open("COM4", 9_600, Duration::from_millis(10)).is_err());
/// assert_eq!(handle.open_attempts().len(), 1);
/// ```
#[derive(Debug)]
pub struct MockPortOpener {
    state: Shared,
}

impl MockPortOpener {
    /// Create an opener and the handle that observes it.
    pub fn new() -> (Self, MockPortHandle) {
        let state = Shared::default();
        let handle = MockPortHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }
}

impl PortOpener for MockPortOpener {
    fn open(&self, port: &str, baud: u32, _read_timeout: Duration) -> Result<PortHandle> {
        let mut state = lock(&self.state);
        state.open_attempts.push((port.to_string(), baud));

        if state.fail_open {
            return Err(HardwareError::open_failed(port, "mock device unavailable"));
        }

        Ok(Box::new(MockPort {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }
}

/// Controls and inspects the devices handed out by a [`MockPortOpener`].
#[derive(Debug, Clone)]
pub struct MockPortHandle {
    state: Shared,
}

impl MockPortHandle {
    /// Make subsequent open attempts fail.
    pub fn set_fail_open(&self, fail: bool) {
        lock(&self.state).fail_open = fail;
    }

    /// Make writes on open devices fail.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// Every flushed write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.state).writes.clone()
    }

    /// `(port, baud)` of every open attempt, failed ones included.
    pub fn open_attempts(&self) -> Vec<(String, u32)> {
        lock(&self.state).open_attempts.clone()
    }

    /// Number of devices released so far.
    pub fn releases(&self) -> usize {
        lock(&self.state).releases
    }
}

/// In-memory device. Bytes become a write record on flush.
struct MockPort {
    state: Shared,
    pending: Vec<u8>,
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if lock(&self.state).fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock device unplugged"));
        }
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock device unplugged"));
        }
        if !self.pending.is_empty() {
            state.writes.push(std::mem::take(&mut self.pending));
        }
        Ok(())
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        lock(&self.state).releases += 1;
    }
}
