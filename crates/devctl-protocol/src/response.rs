//! Device reply decoding.
//!
//! The firmware answers every request with a JSON envelope carrying a
//! numeric status and a human-readable message:
//!
//! ```text
//! {"response":0,"msg":"Pin was turned on"}
//! {"response":1,"msg":"GPIO busy"}
//! ```
//!
//! # Decoding Rules
//!
//! Rules are applied in order, the first match wins:
//!
//! | Condition | Result |
//! |-----------|--------|
//! | not valid JSON | `ParseFailure` |
//! | not a JSON object | `ParseFailure` |
//! | `response` missing or not an integer | `ParseFailure` |
//! | `msg` missing or not a string | `ParseFailure` |
//! | `response != 0` | `OperationFailed{msg}` |
//! | `msg` is not the phrase for the requested action | `OperationFailed{msg}` |
//! | otherwise | `Success` |
//!
//! A reply reporting success with the wrong phrase (for example
//! `"Pin was turned off"` after an `on` request) is a failure.
//!
//! # Bounded Diagnostics
//!
//! Every message is stored in a [`Diagnostic`] of
//! [`DIAGNOSTIC_CAPACITY`] bytes. A message that would not fit makes
//! [`ResponseCodec::parse`] fail with
//! [`ProtocolError::DiagnosticOverflow`] instead of truncating it.

use crate::{ProtocolError, Result};
use devctl_core::PinAction;
use devctl_core::constants::DIAGNOSTIC_CAPACITY;
use serde_json::Value;
use std::fmt::{self, Write};

/// Bounded diagnostic message.
pub type Diagnostic = heapless::String<DIAGNOSTIC_CAPACITY>;

/// Classified device reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceResponse {
    /// The device performed the requested action.
    Success,

    /// The device reported an error, or replied with an unexpected phrase.
    OperationFailed { message: Diagnostic },

    /// The reply is not a well-formed envelope.
    ParseFailure { message: Diagnostic },
}

impl DeviceResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceResponse::Success)
    }

    /// Message carried by a failure, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            DeviceResponse::Success => None,
            DeviceResponse::OperationFailed { message } | DeviceResponse::ParseFailure { message } => {
                Some(message.as_str())
            }
        }
    }
}

/// Decoder for device replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCodec;

impl ResponseCodec {
    /// Decode and classify a device reply to a request for `expected`.
    ///
    /// Trailing whitespace (the firmware's newline) is accepted.
    ///
    /// # Errors
    /// Returns `ProtocolError::DiagnosticOverflow` if the message describing
    /// the outcome does not fit [`DIAGNOSTIC_CAPACITY`] bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use devctl_core::PinAction;
    /// use devctl_protocol::{DeviceResponse, ResponseCodec};
    ///
    /// let reply = br#"{"response":0,"msg":"Pin was turned on"}"#;
    /// let decoded = ResponseCodec::parse(reply, PinAction::On).unwrap();
    /// assert_eq!(decoded, DeviceResponse::Success);
    ///
    /// let decoded = ResponseCodec::parse(b"not json", PinAction::On).unwrap();
    /// assert!(matches!(decoded, DeviceResponse::ParseFailure { .. }));
    /// ```
    pub fn parse(response: &[u8], expected: PinAction) -> Result<DeviceResponse> {
        let value: Value = match serde_json::from_slice(response) {
            Ok(value) => value,
            Err(e) => {
                return parse_failure(format_args!("Failed to parse device response: {e}"));
            }
        };

        let Some(envelope) = value.as_object() else {
            return parse_failure(format_args!("Device response is not an object"));
        };

        let code = match envelope.get("response") {
            None => return parse_failure(format_args!("Device response has no 'response' field")),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n,
            Some(_) => {
                return parse_failure(format_args!("Device field 'response' is not an integer"));
            }
        };

        let msg = match envelope.get("msg") {
            None => return parse_failure(format_args!("Device response has no 'msg' field")),
            Some(Value::String(msg)) => msg.as_str(),
            Some(_) => return parse_failure(format_args!("Device field 'msg' is not a string")),
        };

        if code.as_u64() != Some(0) || msg != expected.expected_reply() {
            return Ok(DeviceResponse::OperationFailed {
                message: diagnostic(format_args!("{msg}"))?,
            });
        }

        Ok(DeviceResponse::Success)
    }
}

fn parse_failure(args: fmt::Arguments<'_>) -> Result<DeviceResponse> {
    Ok(DeviceResponse::ParseFailure {
        message: diagnostic(args)?,
    })
}

/// Format a message into a bounded diagnostic.
///
/// # Errors
/// Returns `ProtocolError::DiagnosticOverflow` if the formatted message does
/// not fit.
pub fn diagnostic(args: fmt::Arguments<'_>) -> Result<Diagnostic> {
    let mut message = Diagnostic::new();
    message
        .write_fmt(args)
        .map_err(|_| ProtocolError::DiagnosticOverflow {
            capacity: DIAGNOSTIC_CAPACITY,
        })?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(reply: &str, expected: PinAction) -> DeviceResponse {
        ResponseCodec::parse(reply.as_bytes(), expected).unwrap()
    }

    #[rstest]
    #[case(r#"{"response":0,"msg":"Pin was turned on"}"#, PinAction::On)]
    #[case(r#"{"response":0,"msg":"Pin was turned off"}"#, PinAction::Off)]
    #[case("{\"response\":0,\"msg\":\"Pin was turned on\"}\n", PinAction::On)]
    #[case(r#"{"msg":"Pin was turned on","response":0,"extra":true}"#, PinAction::On)]
    fn test_success(#[case] reply: &str, #[case] expected: PinAction) {
        assert_eq!(parse(reply, expected), DeviceResponse::Success);
    }

    #[test]
    fn test_phrase_mismatch_is_failure() {
        let decoded = parse(r#"{"response":0,"msg":"Pin was turned off"}"#, PinAction::On);
        assert!(matches!(decoded, DeviceResponse::OperationFailed { .. }));
        assert_eq!(decoded.message(), Some("Pin was turned off"));
    }

    #[test]
    fn test_device_reported_error() {
        let decoded = parse(r#"{"response":1,"msg":"GPIO busy"}"#, PinAction::On);
        assert_eq!(decoded.message(), Some("GPIO busy"));
        assert!(matches!(decoded, DeviceResponse::OperationFailed { .. }));
    }

    #[test]
    fn test_nonzero_with_success_phrase_is_failure() {
        let decoded = parse(r#"{"response":-3,"msg":"Pin was turned on"}"#, PinAction::On);
        assert!(matches!(decoded, DeviceResponse::OperationFailed { .. }));
    }

    #[rstest]
    #[case::not_json("not json")]
    #[case::empty("")]
    #[case::truncated(r#"{"response":0,"msg":"Pin was"#)]
    #[case::array("[0, \"Pin was turned on\"]")]
    #[case::missing_response(r#"{"msg":"Pin was turned on"}"#)]
    #[case::string_response(r#"{"response":"0","msg":"Pin was turned on"}"#)]
    #[case::float_response(r#"{"response":0.5,"msg":"Pin was turned on"}"#)]
    #[case::missing_msg(r#"{"response":0}"#)]
    #[case::numeric_msg(r#"{"response":0,"msg":1}"#)]
    fn test_parse_failure(#[case] reply: &str) {
        let decoded = parse(reply, PinAction::On);
        assert!(
            matches!(decoded, DeviceResponse::ParseFailure { .. }),
            "{reply:?} decoded to {decoded:?}"
        );
        assert!(!decoded.message().unwrap_or_default().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_parse_failure() {
        let decoded = ResponseCodec::parse(&[0xff, 0xfe, b'{'], PinAction::Off).unwrap();
        assert!(matches!(decoded, DeviceResponse::ParseFailure { .. }));
    }

    #[test]
    fn test_missing_response_checked_before_msg() {
        let decoded = parse("{}", PinAction::On);
        assert_eq!(
            decoded.message(),
            Some("Device response has no 'response' field")
        );
    }

    #[test]
    fn test_oversized_device_message_overflows() {
        let long = "x".repeat(DIAGNOSTIC_CAPACITY + 1);
        let reply = format!(r#"{{"response":1,"msg":"{long}"}}"#);
        let result = ResponseCodec::parse(reply.as_bytes(), PinAction::On);
        assert!(matches!(
            result,
            Err(ProtocolError::DiagnosticOverflow { capacity: DIAGNOSTIC_CAPACITY })
        ));
    }

    #[test]
    fn test_device_message_at_capacity_fits() {
        let exact = "y".repeat(DIAGNOSTIC_CAPACITY);
        let reply = format!(r#"{{"response":2,"msg":"{exact}"}}"#);
        let decoded = ResponseCodec::parse(reply.as_bytes(), PinAction::Off).unwrap();
        assert_eq!(decoded.message(), Some(exact.as_str()));
    }
}
