//! Serial request/reply transactions.
//!
//! A transaction is bound to exactly one device path. It opens the device,
//! takes an exclusive non-blocking lock, applies the line configuration,
//! writes the request in a single call and reads one reply. The lock and the
//! handle are released on every exit path when the [`Transaction`] guard
//! drops.

use crate::error::{Result, TransportError};
use crate::line::LineConfig;
use crate::traits::{SerialBackend, SerialLink};
use devctl_core::constants::MSG_MAXLEN;
use std::io;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Caller-sized reply storage. A reply longer than `N` is rejected, never
/// truncated.
pub type ResponseBuffer<const N: usize> = heapless::Vec<u8, N>;

/// Runs transactions through a [`SerialBackend`].
#[derive(Debug, Clone)]
pub struct SerialTransport<B> {
    backend: B,
    line: LineConfig,
}

/// Locked device for the duration of one transaction.
struct Transaction<'a, L> {
    device: &'a str,
    link: L,
}

impl<L> Drop for Transaction<'_, L> {
    fn drop(&mut self) {
        trace!(device = %self.device, "Releasing device");
    }
}

impl<B: SerialBackend> SerialTransport<B> {
    /// Transport using the firmware's line configuration.
    pub fn new(backend: B) -> Self {
        Self::with_line_config(backend, LineConfig::device_default())
    }

    pub fn with_line_config(backend: B, line: LineConfig) -> Self {
        Self { backend, line }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn line_config(&self) -> &LineConfig {
        &self.line
    }

    /// Send `request` to `device` and return its reply.
    ///
    /// `timeout` bounds the wait for the first reply byte and replaces the
    /// configured read timeout. At most `MSG_MAXLEN - 1` bytes are read.
    ///
    /// # Errors
    /// One [`TransportError`] variant per failing step. The device is
    /// released before this returns, whatever the outcome.
    pub fn transact<const N: usize>(
        &self,
        device: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<ResponseBuffer<N>> {
        let handle = self.backend.open(device).map_err(|source| {
            error!(device, %source, "Failed to open device file");
            TransportError::OpenFailed {
                device: device.to_string(),
                source,
            }
        })?;

        let link = self.backend.lock_exclusive(handle).map_err(|source| {
            error!(device, %source, "Failed to lock device for exclusive access");
            TransportError::LockFailed {
                device: device.to_string(),
                source,
            }
        })?;

        let mut tx = Transaction { device, link };
        tx.configure(&self.line.with_read_timeout(timeout))?;
        tx.write_all_once(request)?;
        tx.read_reply(timeout)
    }
}

impl<L: SerialLink> Transaction<'_, L> {
    fn configure(&mut self, line: &LineConfig) -> Result<()> {
        self.link.configure(line).map_err(|source| {
            error!(device = %self.device, %source, "Failed to configure device");
            TransportError::ConfigFailed {
                device: self.device.to_string(),
                source,
            }
        })
    }

    fn write_all_once(&mut self, request: &[u8]) -> Result<()> {
        let written = self.link.write(request).map_err(|source| {
            error!(device = %self.device, %source, "Error writing to device");
            TransportError::WriteFailed {
                device: self.device.to_string(),
                source,
            }
        })?;

        if written < request.len() {
            error!(
                device = %self.device,
                written,
                expected = request.len(),
                "Short write to device"
            );
            return Err(TransportError::WriteFailed {
                device: self.device.to_string(),
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("wrote {written} out of {} bytes", request.len()),
                ),
            });
        }

        debug!(device = %self.device, written, "Wrote request to device");
        Ok(())
    }

    fn read_reply<const N: usize>(&mut self, timeout: Duration) -> Result<ResponseBuffer<N>> {
        let mut chunk = [0u8; MSG_MAXLEN - 1];
        let read = self.link.read(&mut chunk, timeout).map_err(|source| {
            error!(device = %self.device, %source, "Error reading from device");
            TransportError::ReadFailed {
                device: self.device.to_string(),
                source,
            }
        })?;

        if read == 0 {
            debug!(device = %self.device, "Read 0 bytes from device, maybe disconnected");
            return Err(TransportError::Disconnected {
                device: self.device.to_string(),
            });
        }
        debug!(device = %self.device, read, "Read reply from device");

        let mut reply = ResponseBuffer::<N>::new();
        reply
            .extend_from_slice(&chunk[..read])
            .map_err(|_| TransportError::ResponseTooLarge {
                device: self.device.to_string(),
                len: read,
                capacity: N,
            })?;
        Ok(reply)
    }
}
