//! Core constants for the devctl bridge.
//!
//! This module collects every fixed value shared between the serial layer,
//! the wire codec and the RPC dispatcher. None of these values are
//! configurable at runtime: the microcontroller firmware is built against
//! them.
//!
//! # Serial Wire Format
//!
//! Requests and replies are single-line JSON objects:
//!
//! ```text
//! host   -> device: {"action":"on","pin":5}\n
//! device -> host:   {"response":0,"msg":"Pin was turned on"}\n
//! ```
//!
//! Both directions are limited to [`MSG_MAXLEN`] bytes.

use std::time::Duration;

// ============================================================================
// Device Identification
// ============================================================================

/// USB vendor id of the supported microcontroller (Silicon Labs CP210x bridge).
pub const VENDOR_ID: u16 = 0x10C4;

/// USB product id of the supported microcontroller (CP2102 USB-to-UART).
pub const PRODUCT_ID: u16 = 0xEA60;

/// Maximum number of devices reported by `list_devices`.
///
/// Discovery stops once this many matching ports were found.
pub const MAX_DEVICES: usize = 16;

// ============================================================================
// Serial Transaction
// ============================================================================

/// Maximum size of a message in either direction, in bytes.
pub const MSG_MAXLEN: usize = 50;

/// Size of the response buffer handed to a transaction by the dispatcher.
pub const RESPONSE_BUFFER_SIZE: usize = MSG_MAXLEN;

/// Line speed of the device UART.
pub const BAUD_RATE: u32 = 9600;

/// Overall budget for reading a device reply.
///
/// The dispatcher blocks for at most this long per control request.
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Device Replies
// ============================================================================

/// Reply phrase the firmware sends after switching a pin on.
pub const MSG_PIN_ON: &str = "Pin was turned on";

/// Reply phrase the firmware sends after switching a pin off.
pub const MSG_PIN_OFF: &str = "Pin was turned off";

/// Capacity of a decoded diagnostic message, in bytes.
///
/// Diagnostics that do not fit are reported as an error, never truncated.
pub const DIAGNOSTIC_CAPACITY: usize = 128;

// ============================================================================
// RPC Object
// ============================================================================

/// Name of the object registered on the bus.
pub const OBJECT_NAME: &str = "devctl";

/// Method listing the attached devices.
pub const METHOD_LIST_DEVICES: &str = "list_devices";

/// Method switching a pin on.
pub const METHOD_TURN_ON_PIN: &str = "turn_on_pin";

/// Method switching a pin off.
pub const METHOD_TURN_OFF_PIN: &str = "turn_off_pin";
