//! Device discovery.
//!
//! Finds the microcontroller among all serial ports visible to the OS by
//! its USB vendor/product identifier pair. Discovery only reads port
//! metadata; no port is opened.
//!
//! # Truncation
//!
//! The caller bounds the number of results. When more ports match, discovery
//! stops at the bound, returns what it found so far and sets
//! [`Discovery::truncated`]. This is not an error.
//!
//! # Examples
//!
//! ```
//! use devctl_serial::DeviceDiscovery;
//! use devctl_serial::mock::MockPorts;
//!
//! let ports = MockPorts::new();
//! ports.add_usb_port("/dev/ttyUSB0", 0x10C4, 0xEA60);
//! ports.add_usb_port("/dev/ttyACM0", 0x2E8A, 0xA02F);
//!
//! let discovery = DeviceDiscovery::new(ports).discover(16).unwrap();
//! assert_eq!(discovery.paths(), vec!["/dev/ttyUSB0"]);
//! assert!(!discovery.truncated);
//! ```

use crate::error::DiscoveryError;
use crate::traits::PortEnumerator;
use devctl_core::UsbId;
use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

/// Transport a serial port is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortTransport {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

impl From<&SerialPortType> for PortTransport {
    fn from(port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(_) => PortTransport::Usb,
            SerialPortType::PciPort => PortTransport::Pci,
            SerialPortType::BluetoothPort => PortTransport::Bluetooth,
            SerialPortType::Unknown => PortTransport::Unknown,
        }
    }
}

/// A matching serial device, valid for the discovery call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device file path (the port name on Linux).
    pub path: String,
    pub usb_id: UsbId,
    pub transport: PortTransport,
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Matching devices in enumeration order.
    pub devices: Vec<Device>,

    /// More devices matched than the caller allowed.
    pub truncated: bool,
}

impl Discovery {
    /// Device paths in enumeration order.
    pub fn paths(&self) -> Vec<String> {
        self.devices.iter().map(|device| device.path.clone()).collect()
    }
}

/// Port enumeration backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn available_ports(&self) -> serialport::Result<Vec<SerialPortInfo>> {
        serialport::available_ports()
    }
}

/// Finds serial devices exposing a given USB identifier pair.
#[derive(Debug, Clone)]
pub struct DeviceDiscovery<E> {
    enumerator: E,
    usb_id: UsbId,
}

impl<E: PortEnumerator> DeviceDiscovery<E> {
    /// Discovery for the devctl microcontroller (`10C4:EA60`).
    pub fn new(enumerator: E) -> Self {
        Self::with_usb_id(enumerator, UsbId::microcontroller())
    }

    /// Discovery for an arbitrary identifier pair.
    pub fn with_usb_id(enumerator: E, usb_id: UsbId) -> Self {
        Self { enumerator, usb_id }
    }

    pub fn usb_id(&self) -> UsbId {
        self.usb_id
    }

    /// List matching devices, at most `max_results` of them.
    ///
    /// # Errors
    /// Returns `DiscoveryError::EnumerationFailed` if the OS port list could
    /// not be read.
    pub fn discover(&self, max_results: usize) -> Result<Discovery, DiscoveryError> {
        let ports = self.enumerator.available_ports()?;
        let mut discovery = Discovery::default();

        for port in ports {
            let SerialPortType::UsbPort(usb) = &port.port_type else {
                continue;
            };

            debug!("VID: {:04X}, PID: {:04X}", usb.vid, usb.pid);
            if !self.usb_id.matches(usb.vid, usb.pid) {
                continue;
            }

            debug!(device = %port.port_name, "Found device");
            if discovery.devices.len() == max_results {
                warn!(
                    max_results,
                    usb_id = %self.usb_id,
                    "More devices found than requested, result truncated"
                );
                discovery.truncated = true;
                break;
            }

            discovery.devices.push(Device {
                transport: PortTransport::from(&port.port_type),
                usb_id: UsbId::new(usb.vid, usb.pid),
                path: port.port_name,
            });
        }

        Ok(discovery)
    }
}
