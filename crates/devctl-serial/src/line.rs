//! Serial line configuration.
//!
//! The firmware expects a fixed line setup. [`LineConfig`] describes it
//! independently of the OS, and [`LineSettings`] is what the OS reports back
//! after the configuration was applied.
//!
//! A `tcsetattr` call succeeds as soon as *any* of the requested settings
//! could be applied, so success alone proves nothing. Backends read the
//! settings back and call [`LineConfig::verify`], which names the first
//! setting that did not take effect.

use crate::error::LineConfigError;
use devctl_core::constants::{BAUD_RATE, TRANSACTION_TIMEOUT};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// Desired line settings of a serial device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,

    /// Covers both RTS/CTS and XON/XOFF.
    pub flow_control: FlowControl,

    /// Echo received characters back to the device.
    pub echo: bool,

    /// Line-buffered reads: a read returns once a full line is available.
    pub canonical: bool,

    /// Inter-byte read timeout, applied in tenths of a second.
    pub read_timeout: Duration,

    /// Minimum bytes per read; 0 lets a read return empty.
    pub min_bytes: u8,
}

impl LineConfig {
    /// Configuration expected by the devctl firmware: 9600 8N1, no flow
    /// control, no echo, canonical mode, 5 s read timeout, no minimum.
    pub fn device_default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            echo: false,
            canonical: true,
            read_timeout: TRANSACTION_TIMEOUT,
            min_bytes: 0,
        }
    }

    /// Same configuration with a different read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Read timeout in deciseconds, saturating at 25.5 s.
    pub fn vtime(&self) -> u8 {
        u8::try_from(self.read_timeout.as_millis() / 100).unwrap_or(u8::MAX)
    }

    /// Check that `actual` reflects every setting of this configuration.
    ///
    /// # Errors
    /// Returns `LineConfigError::NotApplied` naming the first mismatch.
    pub fn verify(&self, actual: &LineSettings) -> Result<(), LineConfigError> {
        let checks = [
            ("input baud rate", actual.input_baud == Some(self.baud_rate)),
            ("output baud rate", actual.output_baud == Some(self.baud_rate)),
            ("data bits", actual.data_bits == Some(self.data_bits)),
            ("parity", actual.parity == self.parity),
            ("stop bits", actual.stop_bits == self.stop_bits),
            (
                "hardware flow control",
                actual.hardware_flow == (self.flow_control == FlowControl::Hardware),
            ),
            (
                "software flow control",
                actual.software_flow == (self.flow_control == FlowControl::Software),
            ),
            ("echo", actual.echo == self.echo),
            ("canonical mode", actual.canonical == self.canonical),
            ("read timeout", actual.vtime == self.vtime()),
            ("minimum read size", actual.vmin == self.min_bytes),
        ];

        match checks.iter().find(|(_, applied)| !*applied) {
            Some((setting, _)) => Err(LineConfigError::NotApplied { setting: *setting }),
            None => Ok(()),
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self::device_default()
    }
}

/// Line settings as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// `None` when the OS reports a speed without a known numeric value.
    pub input_baud: Option<u32>,
    pub output_baud: Option<u32>,
    pub data_bits: Option<DataBits>,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub hardware_flow: bool,
    pub software_flow: bool,
    pub echo: bool,
    pub canonical: bool,
    pub vtime: u8,
    pub vmin: u8,
}

impl From<&LineConfig> for LineSettings {
    fn from(config: &LineConfig) -> Self {
        Self {
            input_baud: Some(config.baud_rate),
            output_baud: Some(config.baud_rate),
            data_bits: Some(config.data_bits),
            parity: config.parity,
            stop_bits: config.stop_bits,
            hardware_flow: config.flow_control == FlowControl::Hardware,
            software_flow: config.flow_control == FlowControl::Software,
            echo: config.echo,
            canonical: config.canonical,
            vtime: config.vtime(),
            vmin: config.min_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_device_default() {
        let config = LineConfig::device_default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::None);
        assert!(!config.echo);
        assert!(config.canonical);
        assert_eq!(config.vtime(), 50);
        assert_eq!(config.min_bytes, 0);
    }

    #[rstest]
    #[case(Duration::from_millis(0), 0)]
    #[case(Duration::from_millis(250), 2)]
    #[case(Duration::from_secs(5), 50)]
    #[case(Duration::from_secs(60), 255)]
    fn test_vtime(#[case] timeout: Duration, #[case] expected: u8) {
        let config = LineConfig::device_default().with_read_timeout(timeout);
        assert_eq!(config.vtime(), expected);
    }

    #[test]
    fn test_verify_accepts_exact_settings() {
        let config = LineConfig::device_default();
        assert!(config.verify(&LineSettings::from(&config)).is_ok());
    }

    #[rstest]
    #[case::output_speed(|s: &mut LineSettings| s.output_baud = Some(115_200), "output baud rate")]
    #[case::unknown_speed(|s: &mut LineSettings| s.input_baud = None, "input baud rate")]
    #[case::data_bits(|s: &mut LineSettings| s.data_bits = Some(DataBits::Seven), "data bits")]
    #[case::parity(|s: &mut LineSettings| s.parity = Parity::Even, "parity")]
    #[case::stop_bits(|s: &mut LineSettings| s.stop_bits = StopBits::Two, "stop bits")]
    #[case::rtscts(|s: &mut LineSettings| s.hardware_flow = true, "hardware flow control")]
    #[case::xonxoff(|s: &mut LineSettings| s.software_flow = true, "software flow control")]
    #[case::echo(|s: &mut LineSettings| s.echo = true, "echo")]
    #[case::raw_mode(|s: &mut LineSettings| s.canonical = false, "canonical mode")]
    #[case::vtime(|s: &mut LineSettings| s.vtime = 0, "read timeout")]
    #[case::vmin(|s: &mut LineSettings| s.vmin = 1, "minimum read size")]
    fn test_verify_names_partial_application(
        #[case] tamper: fn(&mut LineSettings),
        #[case] expected: &str,
    ) {
        let config = LineConfig::device_default();
        let mut actual = LineSettings::from(&config);
        tamper(&mut actual);

        match config.verify(&actual) {
            Err(LineConfigError::NotApplied { setting }) => assert_eq!(setting, expected),
            other => panic!("expected NotApplied({expected}), got {other:?}"),
        }
    }
}
