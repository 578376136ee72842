//! Error taxonomy surfaced to RPC callers.
//!
//! [`Status`] is the closed set of outcomes a control request can end in.
//! Its numeric codes are part of the bus interface and must never be
//! renumbered. [`RpcResult`] pairs a status with the optional message sent
//! back to the caller.
//!
//! # Wire Format
//!
//! ```text
//! {"status":0}
//! {"status":7,"error":"GPIO busy"}
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome of a request, as reported to the RPC caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The request completed.
    Ok,

    /// Missing or mistyped RPC arguments. Rejected before any device I/O.
    ArgumentInvalid,

    /// The device could not be opened, locked or configured.
    ConnectFail,

    /// Writing the request to the device failed.
    SendFail,

    /// Reading the reply failed or timed out.
    RecvFail,

    /// The device returned no data (zero-byte read).
    Disconnected,

    /// The reply does not fit the response buffer.
    ResponseTooLarge,

    /// The device reported a failure, or replied with an unexpected phrase.
    OperationFailed,

    /// The device reply is not a well-formed envelope.
    ParseFailure,

    /// Discovery failed, or a diagnostic did not fit its buffer.
    UnknownError,

    /// Anything not otherwise classified.
    InternalError,
}

impl Status {
    /// All statuses in code order.
    pub const ALL: [Status; 11] = [
        Status::Ok,
        Status::ArgumentInvalid,
        Status::ConnectFail,
        Status::SendFail,
        Status::RecvFail,
        Status::Disconnected,
        Status::ResponseTooLarge,
        Status::OperationFailed,
        Status::ParseFailure,
        Status::UnknownError,
        Status::InternalError,
    ];

    /// Numeric code sent on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::ArgumentInvalid => 1,
            Status::ConnectFail => 2,
            Status::SendFail => 3,
            Status::RecvFail => 4,
            Status::Disconnected => 5,
            Status::ResponseTooLarge => 6,
            Status::OperationFailed => 7,
            Status::ParseFailure => 8,
            Status::UnknownError => 9,
            Status::InternalError => 10,
        }
    }

    /// Look up a status by its wire code.
    ///
    /// # Errors
    /// Returns `Error::UnknownStatus` if the code is not part of the taxonomy.
    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(Error::UnknownStatus(code))
    }

    /// Generic message returned to callers for statuses whose detail stays
    /// server-side.
    ///
    /// `OperationFailed` and `ParseFailure` carry their own message and have
    /// no generic one.
    #[must_use]
    pub fn generic_message(self) -> Option<&'static str> {
        match self {
            Status::Ok | Status::OperationFailed | Status::ParseFailure => None,
            Status::ArgumentInvalid => Some("Invalid arguments"),
            Status::ConnectFail => Some("Failed to connect to device"),
            Status::SendFail => Some("Failed to send message to device"),
            Status::RecvFail => Some("Failed to get response from device"),
            Status::Disconnected => Some("Device disconnected"),
            Status::ResponseTooLarge => Some("Device response is too large"),
            Status::UnknownError => Some("Unknown error"),
            Status::InternalError => Some("Internal error"),
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "Ok",
            Status::ArgumentInvalid => "ArgumentInvalid",
            Status::ConnectFail => "ConnectFail",
            Status::SendFail => "SendFail",
            Status::RecvFail => "RecvFail",
            Status::Disconnected => "Disconnected",
            Status::ResponseTooLarge => "ResponseTooLarge",
            Status::OperationFailed => "OperationFailed",
            Status::ParseFailure => "ParseFailure",
            Status::UnknownError => "UnknownError",
            Status::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Status::from_code(code)
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Status::from_code(code).map_err(serde::de::Error::custom)
    }
}

/// Result of a control request as returned across the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResult {
    pub status: Status,

    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RpcResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
        }
    }

    /// Failure carrying a caller-visible message.
    #[must_use]
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    /// Failure carrying the status' generic message.
    #[must_use]
    pub fn generic(status: Status) -> Self {
        Self {
            status,
            message: status.generic_message().map(str::to_string),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
