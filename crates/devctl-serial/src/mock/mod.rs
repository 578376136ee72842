//! Scripted serial backend for testing without hardware.
//!
//! [`MockPorts`] stands in for both the OS port list and the device files.
//! Each device path gets a [`MockDevice`] script describing how the
//! microcontroller behind it reacts, including every failure mode a
//! transaction can hit. Open handles and locks are tracked so tests can
//! check that every transaction released its device.

pub mod ports;

pub use ports::{LockGuard, MockDevice, MockHandle, MockLink, MockPorts};
