//! Bus client.
//!
//! Connects to a [`BusServer`](crate::BusServer) socket and issues one call
//! at a time. Used by the `devctld call` subcommand and by tests.
//!
//! # Example Usage
//!
//! ```no_run
//! use devctl_rpc::BusClient;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = BusClient::connect("/run/user/1000/devctl/devctl.sock").await?;
//!
//! let devices = client.call("devctl", "list_devices", json!({})).await?;
//! println!("{devices}");
//!
//! let reply = client
//!     .call("devctl", "turn_on_pin", json!({"device": "/dev/ttyUSB0", "pin": 5}))
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```
//!
//! # Timeout Handling
//!
//! Each call waits at most the configured timeout (default 30 s) for its
//! response. Requests queue behind each other in the daemon, so the default
//! leaves room for several 5 s serial transactions. A response that arrives
//! after its call timed out is skipped by the next call.

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, trace};

/// Default wait for a response.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during bus client operations
#[derive(Debug, Error)]
pub enum BusClientError {
    /// Failed to connect to the socket
    #[error("Failed to connect to {path}: {source}")]
    ConnectFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The server closed the connection
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// No response within the timeout
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// Framing error on the socket
    #[error("Codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// The response is not valid JSON-RPC
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with a JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: Option<Value>,
    },
}

/// Client for the devctl bus.
#[derive(Debug)]
pub struct BusClient {
    framed: Framed<UnixStream, LinesCodec>,
    next_id: u64,
    timeout: Duration,
}

impl BusClient {
    /// Connect to the bus socket at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, BusClientError> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| BusClientError::ConnectFailed {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            framed: Framed::new(stream, LinesCodec::new()),
            next_id: 1,
            timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    /// Change the per-call response timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Call `object.method` with a params object and return its result.
    ///
    /// # Errors
    ///
    /// Returns `BusClientError::Rpc` when the server rejects the call, and a
    /// transport error when the exchange itself fails.
    pub async fn call(
        &mut self,
        object: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, BusClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(format!("{object}.{method}"), params, Value::from(id));
        let encoded = serde_json::to_string(&request)
            .map_err(|e| BusClientError::InvalidResponse(e.to_string()))?;
        trace!(id, method = %request.method, "Sending bus request");
        self.framed.send(encoded).await?;

        let response = match tokio::time::timeout(self.timeout, self.next_response(id)).await {
            Ok(response) => response?,
            Err(_) => return Err(BusClientError::Timeout(self.timeout)),
        };

        match (response.result, response.error) {
            (_, Some(error)) => Err(BusClientError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(BusClientError::InvalidResponse(
                "neither result nor error".to_string(),
            )),
        }
    }

    /// Next response for `id`. Responses to earlier calls that gave up
    /// waiting arrive late and are discarded.
    async fn next_response(&mut self, id: u64) -> Result<JsonRpcResponse, BusClientError> {
        loop {
            let line = match self.framed.next().await {
                Some(line) => line?,
                None => return Err(BusClientError::ConnectionClosed),
            };
            let response: JsonRpcResponse = serde_json::from_str(&line)
                .map_err(|e| BusClientError::InvalidResponse(e.to_string()))?;

            match response.id.as_u64() {
                Some(received) if received == id => return Ok(response),
                Some(received) if received < id => {
                    debug!(received, expected = id, "Discarding stale response");
                }
                _ => {
                    return Err(BusClientError::InvalidResponse(format!(
                        "expected id {id}, got {}",
                        response.id
                    )));
                }
            }
        }
    }
}
