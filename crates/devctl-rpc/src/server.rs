//! Unix socket bus server.
//!
//! Accepts any number of local clients, each speaking newline-delimited
//! JSON-RPC 2.0. Requests from every connection are forwarded to a single
//! dispatch loop and executed one at a time in arrival order, so at most one
//! serial transaction is in flight per daemon.
//!
//! # Architecture
//!
//! ```text
//! connection task ┐
//!                 │   (Call, oneshot reply)
//! connection task ├──────────► mpsc ──► dispatch loop ──► spawn_blocking(Router::call)
//!                 │
//! connection task ┘
//! ```
//!
//! The blocking transaction runs on the blocking pool while the loop awaits
//! it, so connection tasks keep reading and queueing requests meanwhile.

use crate::error::RpcError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::router::Router;
use devctl_core::{RpcResult, Status};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, trace, warn};

/// Longest accepted request line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Requests that may wait for the dispatch loop before senders block.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Default socket path: `$XDG_RUNTIME_DIR/devctl/devctl.sock`, falling back
/// to `/tmp/devctl/devctl.sock`.
pub fn default_socket_path() -> PathBuf {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    runtime_dir.join("devctl").join("devctl.sock")
}

/// Configuration for the bus server
#[derive(Debug, Clone)]
pub struct BusServerConfig {
    /// Socket file to listen on
    pub socket_path: PathBuf,

    /// Longest accepted request line, in bytes
    pub max_line_length: usize,

    /// Capacity of the dispatch queue
    pub queue_depth: usize,
}

impl Default for BusServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl BusServerConfig {
    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Self::default()
        }
    }
}

/// Errors that can occur while running the bus server
#[derive(Debug, Error)]
pub enum BusServerError {
    /// Socket directory or file could not be prepared
    #[error("Failed to prepare socket {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind to the socket path
    #[error("Failed to bind to {path}: {source}")]
    BindFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One request waiting for the dispatch loop.
struct Call {
    method: String,
    params: Value,
    reply: oneshot::Sender<Result<Value, RpcError>>,
}

/// Bus server bound to a Unix socket.
///
/// # Example
///
/// ```no_run
/// use devctl_rpc::{BusServer, BusServerConfig, RequestDispatcher, devctl_router};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BusServerConfig::with_socket_path("/run/devctl/devctl.sock");
/// let server = BusServer::bind(config, devctl_router(), RequestDispatcher::system()).await?;
///
/// let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
/// # drop(stop);
/// server.run_until(async { stopped.await.unwrap_or(()) }).await?;
/// # Ok(())
/// # }
/// ```
pub struct BusServer<C> {
    listener: UnixListener,
    config: BusServerConfig,
    router: Arc<Router<C>>,
    context: Arc<C>,
}

impl<C: Send + Sync + 'static> BusServer<C> {
    /// Bind the configured socket.
    ///
    /// Creates the socket directory, removes a stale socket file left by a
    /// previous run and restricts the new socket to its owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the stale file
    /// cannot be removed, or the socket cannot be bound.
    pub async fn bind(
        config: BusServerConfig,
        router: Router<C>,
        context: C,
    ) -> Result<Self, BusServerError> {
        let path = &config.socket_path;
        let prepare = |source| BusServerError::Prepare {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(prepare)?;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(socket = %path.display(), "Removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(prepare(e)),
        }

        let listener = UnixListener::bind(path).map_err(|source| BusServerError::BindFailed {
            path: path.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(path, perms)
                .await
                .map_err(prepare)?;
        }

        info!(
            socket = %path.display(),
            object = router.object(),
            "Bus server listening"
        );

        Ok(Self {
            listener,
            router: Arc::new(router),
            context: Arc::new(context),
            config,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Serve until `shutdown` completes, then stop accepting, close all
    /// connections, let the dispatch loop finish and remove the socket file.
    ///
    /// A transaction already running completes. Calls still queued belong to
    /// closed connections and never reach a device.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket file cannot be removed.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), BusServerError>
    where
        F: Future<Output = ()>,
    {
        let (calls, queue) = mpsc::channel(self.config.queue_depth);
        let dispatcher = tokio::spawn(dispatch_loop(
            queue,
            Arc::clone(&self.router),
            Arc::clone(&self.context),
        ));

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, closing bus server");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        while connections.try_join_next().is_some() {}
                        debug!(active = connections.len() + 1, "Accepted bus connection");
                        connections.spawn(handle_connection(
                            stream,
                            calls.clone(),
                            self.config.max_line_length,
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept bus connection");
                    }
                }
            }
        }

        connections.shutdown().await;
        drop(calls);
        if let Err(e) = dispatcher.await {
            error!(error = %e, "Dispatch loop ended abnormally");
        }

        drop(self.listener);
        match tokio::fs::remove_file(&self.config.socket_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BusServerError::Io(e)),
        }
        info!(socket = %self.config.socket_path.display(), "Bus server stopped");
        Ok(())
    }
}

/// Execute queued calls one at a time.
async fn dispatch_loop<C: Send + Sync + 'static>(
    mut queue: mpsc::Receiver<Call>,
    router: Arc<Router<C>>,
    context: Arc<C>,
) {
    while let Some(Call {
        method,
        params,
        reply,
    }) = queue.recv().await
    {
        // Connections are aborted on shutdown, leaving their queued calls orphaned.
        if reply.is_closed() {
            debug!(%method, "Skipping call, caller went away");
            continue;
        }

        trace!(%method, "Dispatching call");
        let router = Arc::clone(&router);
        let context = Arc::clone(&context);
        let task_method = method.clone();

        let outcome =
            tokio::task::spawn_blocking(move || router.call(&context, &task_method, &params))
                .await
                .unwrap_or_else(|e| {
                    error!(%method, error = %e, "Blocking call failed");
                    serde_json::to_value(RpcResult::generic(Status::InternalError))
                        .map_err(|e| RpcError::Internal(e.to_string()))
                });

        if reply.send(outcome).is_err() {
            debug!(%method, "Caller went away before the reply");
        }
    }
}

/// Read requests from one client and write a response for each.
async fn handle_connection(
    stream: UnixStream,
    calls: mpsc::Sender<Call>,
    max_line_length: usize,
) {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(max_line_length));

    while let Some(line) = framed.next().await {
        let response = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => process_line(&line, &calls).await,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(max_line_length, "Request line too long");
                let error =
                    RpcError::InvalidRequest(format!("request exceeds {max_line_length} bytes"));
                JsonRpcResponse::error(Value::Null, &error)
            }
            Err(LinesCodecError::Io(e)) => {
                warn!(error = %e, "Bus connection read failed");
                break;
            }
        };

        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(error = %e, "Failed to encode response");
                break;
            }
        };
        if let Err(e) = framed.send(encoded).await {
            warn!(error = %e, "Bus connection write failed");
            break;
        }
    }

    trace!("Bus connection closed");
}

/// Parse one request line and wait for its outcome.
async fn process_line(line: &str, calls: &mpsc::Sender<Call>) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Unparseable request");
            return JsonRpcResponse::parse_error(e.to_string());
        }
    };

    let params = match request.validate() {
        Ok(params) => params,
        Err(e) => return JsonRpcResponse::error(request.id, &e),
    };

    let (reply, outcome) = oneshot::channel();
    let call = Call {
        method: request.method,
        params,
        reply,
    };
    if calls.send(call).await.is_err() {
        return JsonRpcResponse::error(
            request.id,
            &RpcError::Internal("dispatcher stopped".into()),
        );
    }

    let outcome = outcome
        .await
        .unwrap_or_else(|_| Err(RpcError::Internal("dispatcher dropped the call".into())));
    JsonRpcResponse::from_outcome(request.id, outcome)
}
