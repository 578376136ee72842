//! Request encoding.
//!
//! A request is the JSON form of a [`PinCommand`] followed by a newline, so
//! the firmware (and a canonical-mode tty) sees exactly one line.
//!
//! # Examples
//!
//! ```
//! use devctl_core::{PinAction, PinCommand};
//! use devctl_protocol::encode_request;
//!
//! let frame = encode_request(&PinCommand::new(PinAction::On, 5)).unwrap();
//! assert_eq!(frame.as_slice(), b"{\"action\":\"on\",\"pin\":5}\n");
//! ```

use crate::{ProtocolError, Result};
use devctl_core::PinCommand;
use devctl_core::constants::MSG_MAXLEN;

/// Encoded request, at most [`MSG_MAXLEN`] bytes.
pub type RequestFrame = heapless::Vec<u8, MSG_MAXLEN>;

/// Encode a command into a newline-terminated request frame.
///
/// # Errors
/// Returns `ProtocolError::RequestTooLarge` if the encoded request does not
/// fit [`MSG_MAXLEN`] bytes.
pub fn encode_request(command: &PinCommand) -> Result<RequestFrame> {
    let mut encoded = serde_json::to_vec(command)?;
    encoded.push(b'\n');

    let mut frame = RequestFrame::new();
    frame
        .extend_from_slice(&encoded)
        .map_err(|_| ProtocolError::RequestTooLarge {
            len: encoded.len(),
            capacity: MSG_MAXLEN,
        })?;
    Ok(frame)
}
