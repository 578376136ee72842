//! RPC layer of the devctl bridge.
//!
//! This crate exposes the `devctl` object on a local bus and turns each
//! call into a serial transaction.
//!
//! # Components
//!
//! - [`RequestDispatcher`]: validates arguments, runs discovery or a serial
//!   transaction and maps the outcome onto a [`Status`](devctl_core::Status).
//! - [`Router`]: explicit `object.method` table built once at startup.
//! - [`BusServer`]: Unix socket server speaking newline-delimited JSON-RPC
//!   2.0, funnelling every request into one dispatch loop.
//! - [`BusClient`]: minimal client for the same bus.
//!
//! # Architecture
//!
//! ```text
//! client ┐
//!        │  JSON-RPC lines
//! client ├──> BusServer ──(mpsc)──> dispatch loop ──(spawn_blocking)──> Router
//!        │                                                               │
//! client ┘                                                               ▼
//!                                                              RequestDispatcher
//!                                                                        │
//!                                               DeviceDiscovery / SerialTransport
//! ```
//!
//! # Example
//!
//! ```no_run
//! use devctl_rpc::{BusServer, BusServerConfig, RequestDispatcher, devctl_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = BusServer::bind(
//!     BusServerConfig::default(),
//!     devctl_router(),
//!     RequestDispatcher::system(),
//! )
//! .await?;
//!
//! server.run_until(async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod router;
mod server;

pub use client::{BusClient, BusClientError};
pub use dispatcher::{ControlArgs, ControlError, ListDevicesReply, RequestDispatcher, devctl_router};
pub use error::RpcError;
pub use router::{Handler, Router};
pub use server::{BusServer, BusServerConfig, BusServerError, default_socket_path};
