//! Serial wire format spoken by the devctl microcontroller firmware.
//!
//! The host sends one newline-terminated JSON request per transaction and
//! the device answers with one JSON envelope:
//!
//! ```text
//! {"action":"on","pin":5}\n          (host -> device)
//! {"response":0,"msg":"Pin was turned on"}   (device -> host)
//! ```
//!
//! - [`request`] encodes a [`PinCommand`](devctl_core::PinCommand) into a
//!   capacity-checked frame.
//! - [`response`] decodes and classifies the device envelope.
//!
//! Both directions are bounded by
//! [`MSG_MAXLEN`](devctl_core::constants::MSG_MAXLEN); nothing here
//! truncates silently.

pub mod error;
pub mod request;
pub mod response;

pub use error::{ProtocolError, Result};
pub use request::{RequestFrame, encode_request};
pub use response::{DeviceResponse, Diagnostic, ResponseCodec};
