//! Error types for serial device operations.
//!
//! Each transaction step has its own variant so the RPC layer can map it
//! onto the caller-facing status without inspecting messages.

use std::io;

/// Result type alias for transaction operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failure of one transaction step.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The device path could not be opened.
    #[error("Failed to open device file {device}: {source}")]
    OpenFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The device is locked by another holder.
    #[error("Failed to lock device {device} for exclusive access: {source}")]
    LockFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The line settings could not be applied or did not stick.
    #[error("Failed to configure device {device}: {source}")]
    ConfigFailed {
        device: String,
        #[source]
        source: LineConfigError,
    },

    /// Writing the request failed or was short.
    #[error("Error writing to device {device}: {source}")]
    WriteFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// Reading the reply failed or timed out.
    #[error("Error reading from device {device}: {source}")]
    ReadFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// The read returned zero bytes.
    #[error("Read 0 bytes from device {device}, maybe disconnected")]
    Disconnected { device: String },

    /// The reply does not fit the caller's buffer.
    #[error("Response of {len} bytes from device {device} exceeds the {capacity} byte buffer")]
    ResponseTooLarge {
        device: String,
        len: usize,
        capacity: usize,
    },
}

impl TransportError {
    /// Device path the failed transaction was bound to.
    pub fn device(&self) -> &str {
        match self {
            Self::OpenFailed { device, .. }
            | Self::LockFailed { device, .. }
            | Self::ConfigFailed { device, .. }
            | Self::WriteFailed { device, .. }
            | Self::ReadFailed { device, .. }
            | Self::Disconnected { device }
            | Self::ResponseTooLarge { device, .. } => device,
        }
    }

    /// Whether this is a read that saw no data before the timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadFailed { source, .. } if source.kind() == io::ErrorKind::TimedOut)
    }
}

/// Failure to apply the line configuration.
#[derive(Debug, thiserror::Error)]
pub enum LineConfigError {
    /// The current settings could not be read.
    #[error("failed to get current port configuration: {0}")]
    Query(#[source] io::Error),

    /// The new settings were rejected.
    #[error("failed to set serial port settings: {0}")]
    Apply(#[source] io::Error),

    /// The platform has no constant for the requested speed.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The settings were accepted but one of them did not take effect.
    #[error("{setting} was not applied")]
    NotApplied { setting: &'static str },
}

/// Failure to enumerate the system's serial ports.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to list serial ports: {0}")]
    EnumerationFailed(#[from] serialport::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_accessor() {
        let error = TransportError::Disconnected {
            device: "/dev/ttyUSB0".to_string(),
        };
        assert_eq!(error.device(), "/dev/ttyUSB0");
        assert_eq!(
            error.to_string(),
            "Read 0 bytes from device /dev/ttyUSB0, maybe disconnected"
        );
    }

    #[test]
    fn test_timeout_classification() {
        let timeout = TransportError::ReadFailed {
            device: "/dev/ttyUSB0".to_string(),
            source: io::Error::new(io::ErrorKind::TimedOut, "no data"),
        };
        let broken = TransportError::ReadFailed {
            device: "/dev/ttyUSB0".to_string(),
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        assert!(timeout.is_timeout());
        assert!(!broken.is_timeout());
    }

    #[test]
    fn test_config_error_display() {
        let error = TransportError::ConfigFailed {
            device: "/dev/ttyUSB1".to_string(),
            source: LineConfigError::NotApplied { setting: "baud rate" },
        };
        assert_eq!(
            error.to_string(),
            "Failed to configure device /dev/ttyUSB1: baud rate was not applied"
        );
    }
}
