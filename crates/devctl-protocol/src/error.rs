//! Error types for the serial wire format.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding requests or building diagnostics.
///
/// A malformed device reply is not an error at this level: it decodes to
/// [`DeviceResponse::ParseFailure`](crate::DeviceResponse::ParseFailure).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The encoded request does not fit the request frame.
    #[error("Request of {len} bytes exceeds the {capacity} byte frame")]
    RequestTooLarge { len: usize, capacity: usize },

    /// The request could not be serialized.
    #[error("Failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A diagnostic message does not fit its bounded buffer.
    #[error("Diagnostic message exceeds {capacity} bytes")]
    DiagnosticOverflow { capacity: usize },
}
