//! Errors returned to bus callers as JSON-RPC error objects.

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use devctl_core::Status;
use serde_json::{Value, json};

/// A call rejected at the RPC level.
///
/// Device outcomes are not errors here: they travel as a `{status}` result.
/// This type covers requests that never reached a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    /// Missing, mistyped or empty arguments.
    #[error("Invalid arguments: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Parse(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Extra error data. Argument errors carry their status code so callers
    /// see the same taxonomy as device failures.
    pub fn data(&self) -> Option<Value> {
        match self {
            RpcError::InvalidParams(_) => Some(json!({ "status": Status::ArgumentInvalid })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RpcError::Parse("eof".into()), -32700)]
    #[case(RpcError::InvalidRequest("no method".into()), -32600)]
    #[case(RpcError::MethodNotFound("devctl.reboot".into()), -32601)]
    #[case(RpcError::InvalidParams("pin".into()), -32602)]
    #[case(RpcError::Internal("join".into()), -32603)]
    fn test_codes(#[case] error: RpcError, #[case] code: i32) {
        assert_eq!(error.code(), code);
    }

    #[test]
    fn test_only_argument_errors_carry_status() {
        assert_eq!(
            RpcError::InvalidParams("pin".into()).data(),
            Some(json!({"status": 1}))
        );
        assert_eq!(RpcError::Internal("x".into()).data(), None);
    }
}
