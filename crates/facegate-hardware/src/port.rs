//! Port acquisition and discovery.

use crate::error::{HardwareError, Result};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// An acquired serial device, reduced to what the link needs: writing.
pub type PortHandle = Box<dyn Write + Send>;

/// Acquires serial devices.
///
/// The seam between [`SerialLink`](crate::SerialLink) and the operating
/// system. Implementations must not panic; every failure is an error value.
pub trait PortOpener: Send {
    /// Open `port` at `baud`. `read_timeout` bounds the acquisition only.
    fn open(&self, port: &str, baud: u32, read_timeout: Duration) -> Result<PortHandle>;
}

/// Opens real devices through the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, port: &str, baud: u32, read_timeout: Duration) -> Result<PortHandle> {
        debug!("Opening {} at {} baud", port, baud);

        let device = serialport::new(port, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|e| HardwareError::open_failed(port, e.description))?;

        Ok(Box::new(device))
    }
}

/// Open `port` for reading, as the controller side of the link does.
///
/// Reads time out after `read_timeout` with `ErrorKind::TimedOut`.
///
/// # Errors
/// Returns `HardwareError::OpenFailed` if the device cannot be acquired.
pub fn open_reader(port: &str, baud: u32, read_timeout: Duration) -> Result<Box<dyn Read + Send>> {
    let device = serialport::new(port, baud)
        .timeout(read_timeout)
        .open()
        .map_err(|e| HardwareError::open_failed(port, e.description))?;

    Ok(Box::new(device))
}

/// A serial device present on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or name (`/dev/ttyUSB0`, `COM4`).
    pub name: String,

    /// Human-readable description of the device type.
    pub kind: String,
}

/// List serial devices present on this host.
///
/// # Errors
/// Returns `HardwareError::Enumeration` if the OS query fails.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            name: port.port_name,
            kind: describe(&port.port_type),
        })
        .collect())
}

fn describe(port_type: &serialport::SerialPortType) -> String {
    use serialport::SerialPortType;

    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb
                .product
                .as_deref()
                .or(usb.manufacturer.as_deref())
                .unwrap_or("USB serial");
            format!("{product} ({:04x}:{:04x})", usb.vid, usb.pid)
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::SerialPortType;

    #[test]
    fn test_describe_other_ports() {
        assert_eq!(describe(&SerialPortType::PciPort), "PCI");
        assert_eq!(describe(&SerialPortType::Unknown), "Unknown");
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = SystemPortOpener.open(
            "/dev/facegate-no-such-port",
            115_200,
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(HardwareError::OpenFailed { .. })));
    }

    #[test]
    fn test_open_reader_missing_device_fails() {
        let result = open_reader("/dev/facegate-no-such-port", 115_200, Duration::from_millis(10));
        assert!(matches!(result, Err(HardwareError::OpenFailed { .. })));
    }
}
