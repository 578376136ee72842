//! Serial device layer for the devctl bridge.
//!
//! This crate owns everything that touches the microcontroller's serial
//! port: finding it among the ports the OS exposes, and running one
//! exclusive request/reply transaction against it.
//!
//! # Components
//!
//! - [`DeviceDiscovery`]: enumerates serial ports and keeps the USB ports
//!   matching a vendor/product pair, in enumeration order.
//! - [`SerialTransport`]: runs a transaction (open, lock, configure, write,
//!   read) and releases the device on every exit path.
//! - [`LineConfig`]: the fixed line settings, applied and then verified
//!   setting by setting.
//!
//! # Transaction Steps
//!
//! ```text
//! open ──► lock (exclusive, non-blocking) ──► configure ──► write ──► read
//!   │            │                               │            │         │
//!   ▼            ▼                               ▼            ▼         ▼
//! OpenFailed  LockFailed                    ConfigFailed  WriteFailed  ReadFailed
//!                                                                     Disconnected
//!                                                                     ResponseTooLarge
//! ```
//!
//! # Backends
//!
//! OS access sits behind the [`PortEnumerator`], [`SerialBackend`] and
//! [`SerialLink`] traits:
//!
//! - [`SystemPorts`] and [`TtyBackend`] talk to the real system
//!   (`serialport` enumeration, `flock`, termios, `poll`).
//! - [`mock::MockPorts`] scripts every failure mode for tests.
//!
//! ```no_run
//! use devctl_serial::{DeviceDiscovery, SerialTransport, SystemPorts, TtyBackend};
//! use devctl_core::constants::{MAX_DEVICES, RESPONSE_BUFFER_SIZE, TRANSACTION_TIMEOUT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let discovery = DeviceDiscovery::new(SystemPorts);
//! let transport = SerialTransport::new(TtyBackend);
//!
//! for device in discovery.discover(MAX_DEVICES)?.devices {
//!     let reply = transport.transact::<RESPONSE_BUFFER_SIZE>(
//!         &device.path,
//!         b"{\"action\":\"on\",\"pin\":5}\n",
//!         TRANSACTION_TIMEOUT,
//!     )?;
//!     println!("{}: {}", device.path, String::from_utf8_lossy(&reply));
//! }
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod line;
pub mod mock;
pub mod traits;
pub mod transport;
#[cfg(unix)]
pub mod tty;

pub use discovery::{Device, DeviceDiscovery, Discovery, PortTransport, SystemPorts};
pub use error::{DiscoveryError, LineConfigError, Result, TransportError};
pub use line::{LineConfig, LineSettings};
pub use traits::{PortEnumerator, SerialBackend, SerialLink};
pub use transport::{ResponseBuffer, SerialTransport};
#[cfg(unix)]
pub use tty::{TtyBackend, TtyLink};
