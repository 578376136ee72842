//! Backend traits for serial device access.
//!
//! These traits are the seam between the transaction logic and the OS. The
//! transaction only ever talks to them, so the real tty backend and the
//! scripted mock behave identically from the transport's point of view.
//!
//! Locking is expressed as a type-state: [`SerialBackend::open`] yields an
//! unlocked handle, and only [`SerialBackend::lock_exclusive`] turns it into
//! a usable [`SerialLink`]. Dropping either value releases what it holds.

use crate::error::LineConfigError;
use crate::line::LineConfig;
use serialport::SerialPortInfo;
use std::io;
use std::time::Duration;

/// Source of serial port metadata.
pub trait PortEnumerator: Send + Sync {
    /// List every serial port visible to the OS, in platform order.
    ///
    /// Must not open any port.
    fn available_ports(&self) -> serialport::Result<Vec<SerialPortInfo>>;
}

/// Opens and locks serial devices.
pub trait SerialBackend: Send + Sync {
    /// An open, unlocked device.
    type Handle;

    /// An open device held under an exclusive lock.
    type Link: SerialLink;

    /// Open `path` for reading and writing.
    fn open(&self, path: &str) -> io::Result<Self::Handle>;

    /// Take an exclusive lock on an open handle without waiting.
    ///
    /// Fails immediately if another holder has the lock. The handle is
    /// closed on failure.
    fn lock_exclusive(&self, handle: Self::Handle) -> io::Result<Self::Link>;
}

/// An exclusively held serial device.
pub trait SerialLink {
    /// Apply `line` and verify each setting took effect.
    fn configure(&mut self, line: &LineConfig) -> Result<(), LineConfigError>;

    /// Write `data` in a single call, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read into `buf`, waiting at most `timeout` for data to arrive.
    ///
    /// Returns `Ok(0)` when the device hung up. No data before the timeout
    /// is an error of kind [`io::ErrorKind::TimedOut`].
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}
