//! Serial port handling
//!
//! Discovers and opens the port the sensor microcontroller writes its
//! records to.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::time::Duration;
use thiserror::Error;

/// Baud rate the sensor firmware writes at
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
///
/// Reads that time out are retried by the bridge loop, so this only bounds
/// how long a single blocking read lasts.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Errors from the serial transport
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to configure port: {0}")]
    Configure(#[from] serialport::Error),
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// Whether the port sits on USB (where sensor boards usually appear)
    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                (Some(usb.vid), Some(usb.pid), usb.manufacturer, usb.product)
            }
            _ => (None, None, None, None),
        };
        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

/// USB ports before everything else, then by name
fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by(|a, b| (!a.is_usb(), &a.name).cmp(&(!b.is_usb(), &b.name)));
}

/// List available serial ports, USB first
///
/// Enumeration failures are logged and yield an empty list.
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(found) => found.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("Serial port enumeration failed: {e}");
            Vec::new()
        }
    };
    sort_ports(&mut ports);
    ports
}

/// Open and configure a serial port for reading records
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, SerialError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    tracing::debug!("opening {name} at {baud} baud");

    let mut port = serialport::new(name, baud)
        .timeout(read_timeout)
        .open()
        .map_err(|source| SerialError::Open {
            port: name.to_string(),
            source,
        })?;
    configure_port(port.as_mut())?;
    Ok(port)
}

/// Apply 8N1 framing with no flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), SerialError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;

    // Holding DTR high keeps Arduino-style boards from resetting on open
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("configure_port: failed to set DTR high: {e} (continuing)");
    }

    port.clear(serialport::ClearBuffer::Input)?;
    Ok(())
}
