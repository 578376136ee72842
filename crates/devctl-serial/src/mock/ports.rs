//! Mock port list and device files.

use crate::error::LineConfigError;
use crate::line::{LineConfig, LineSettings};
use crate::traits::{PortEnumerator, SerialBackend, SerialLink};
use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How a scripted device reacts to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    reply: Reply,
    open_error: Option<io::ErrorKind>,
    unapplied: Option<&'static str>,
    write: WriteMode,
    latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Bytes(Vec<u8>),
    Silent,
    HangUp,
    Error(io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Full,
    Short(usize),
    Error(io::ErrorKind),
}

impl MockDevice {
    /// Accepts the request and answers with `reply`.
    pub fn replying(reply: &[u8]) -> Self {
        Self {
            reply: Reply::Bytes(reply.to_vec()),
            open_error: None,
            unapplied: None,
            write: WriteMode::Full,
            latency: Duration::ZERO,
        }
    }

    /// Never answers; reads time out.
    pub fn silent() -> Self {
        Self {
            reply: Reply::Silent,
            ..Self::replying(b"")
        }
    }

    /// Reads return zero bytes.
    pub fn hanging_up() -> Self {
        Self {
            reply: Reply::HangUp,
            ..Self::replying(b"")
        }
    }

    /// The device file cannot be opened.
    pub fn unopenable(kind: io::ErrorKind) -> Self {
        Self {
            open_error: Some(kind),
            ..Self::silent()
        }
    }

    /// Accepts the line settings but leaves `setting` unapplied.
    pub fn misconfigured(setting: &'static str) -> Self {
        Self {
            unapplied: Some(setting),
            ..Self::silent()
        }
    }

    /// Writes at most `limit` bytes per call.
    pub fn short_write(limit: usize) -> Self {
        Self {
            write: WriteMode::Short(limit),
            ..Self::silent()
        }
    }

    /// Every write fails with `kind`.
    pub fn failing_write(kind: io::ErrorKind) -> Self {
        Self {
            write: WriteMode::Error(kind),
            ..Self::silent()
        }
    }

    /// Block every read for `latency` before answering, as a slow device would.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every read fails with `kind`.
    pub fn failing_read(kind: io::ErrorKind) -> Self {
        Self {
            reply: Reply::Error(kind),
            ..Self::replying(b"")
        }
    }
}

#[derive(Debug, Default)]
struct State {
    ports: Vec<SerialPortInfo>,
    enumeration_error: Option<String>,
    devices: HashMap<String, MockDevice>,
    locked: HashSet<String>,
    writes: HashMap<String, Vec<Vec<u8>>>,
    line_configs: HashMap<String, LineConfig>,
    open_count: usize,
    open_handles: usize,
}

/// Shared mock of the system's serial ports.
///
/// Clones share state, so a test keeps one clone for inspection and hands
/// another to the code under test.
///
/// # Examples
///
/// ```
/// use devctl_serial::SerialTransport;
/// use devctl_serial::mock::{MockDevice, MockPorts};
/// use std::time::Duration;
///
/// let ports = MockPorts::new();
/// ports.script("/dev/ttyUSB0", MockDevice::replying(b"Turned on pin 2\n"));
///
/// let transport = SerialTransport::new(ports.clone());
/// let reply = transport
///     .transact::<50>("/dev/ttyUSB0", b"{\"action\":\"on\",\"pin\":2}\n", Duration::from_secs(5))
///     .unwrap();
///
/// assert_eq!(&reply[..], b"Turned on pin 2\n");
/// assert_eq!(ports.open_handles(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPorts {
    state: Arc<Mutex<State>>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// List a USB serial port with the given identifiers.
    pub fn add_usb_port(&self, path: &str, vid: u16, pid: u16) {
        self.add_port(
            path,
            SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid,
                serial_number: None,
                manufacturer: None,
                product: None,
            }),
        );
    }

    /// List a port of any type.
    pub fn add_port(&self, path: &str, port_type: SerialPortType) {
        self.state().ports.push(SerialPortInfo {
            port_name: path.to_string(),
            port_type,
        });
    }

    /// Make enumeration fail from now on.
    pub fn fail_enumeration(&self, description: &str) {
        self.state().enumeration_error = Some(description.to_string());
    }

    /// Attach a device script to `path`. Paths without a script cannot be
    /// opened.
    pub fn script(&self, path: &str, device: MockDevice) {
        self.state().devices.insert(path.to_string(), device);
    }

    /// Hold the lock on `path` as another process would, until the guard drops.
    pub fn hold_lock(&self, path: &str) -> LockGuard {
        self.state().locked.insert(path.to_string());
        LockGuard {
            ports: self.clone(),
            path: path.to_string(),
        }
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state().open_handles
    }

    /// Payloads written to `path`, in order.
    pub fn writes(&self, path: &str) -> Vec<Vec<u8>> {
        self.state().writes.get(path).cloned().unwrap_or_default()
    }

    /// Line configuration last applied to `path`.
    pub fn last_line_config(&self, path: &str) -> Option<LineConfig> {
        self.state().line_configs.get(path).copied()
    }

    fn unlock(&self, path: &str) {
        self.state().locked.remove(path);
    }
}

impl PortEnumerator for MockPorts {
    fn available_ports(&self) -> serialport::Result<Vec<SerialPortInfo>> {
        let state = self.state();
        match &state.enumeration_error {
            Some(description) => Err(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                description.as_str(),
            )),
            None => Ok(state.ports.clone()),
        }
    }
}

impl SerialBackend for MockPorts {
    type Handle = MockHandle;
    type Link = MockLink;

    fn open(&self, path: &str) -> io::Result<MockHandle> {
        let mut state = self.state();
        let device = state
            .devices
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such device"))?;
        if let Some(kind) = device.open_error {
            return Err(io::Error::from(kind));
        }

        state.open_count += 1;
        state.open_handles += 1;
        Ok(MockHandle {
            ports: self.clone(),
            path: path.to_string(),
            device,
        })
    }

    fn lock_exclusive(&self, handle: MockHandle) -> io::Result<MockLink> {
        if !self.state().locked.insert(handle.path.clone()) {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "resource temporarily unavailable",
            ));
        }
        Ok(MockLink { handle })
    }
}

/// Open, unlocked mock device.
#[derive(Debug)]
pub struct MockHandle {
    ports: MockPorts,
    path: String,
    device: MockDevice,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.ports.state().open_handles -= 1;
    }
}

/// Locked mock device.
#[derive(Debug)]
pub struct MockLink {
    handle: MockHandle,
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.handle.ports.unlock(&self.handle.path);
    }
}

impl SerialLink for MockLink {
    fn configure(&mut self, line: &LineConfig) -> Result<(), LineConfigError> {
        self.handle
            .ports
            .state()
            .line_configs
            .insert(self.handle.path.clone(), *line);

        line.verify(&LineSettings::from(line))?;
        match self.handle.device.unapplied {
            Some(setting) => Err(LineConfigError::NotApplied { setting }),
            None => Ok(()),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let written = match self.handle.device.write {
            WriteMode::Full => data.len(),
            WriteMode::Short(limit) => data.len().min(limit),
            WriteMode::Error(kind) => return Err(io::Error::from(kind)),
        };
        self.handle
            .ports
            .state()
            .writes
            .entry(self.handle.path.clone())
            .or_default()
            .push(data[..written].to_vec());
        Ok(written)
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        if !self.handle.device.latency.is_zero() {
            std::thread::sleep(self.handle.device.latency);
        }
        match &self.handle.device.reply {
            Reply::Bytes(reply) => {
                let len = reply.len().min(buf.len());
                buf[..len].copy_from_slice(&reply[..len]);
                Ok(len)
            }
            Reply::Silent => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no data before read timeout",
            )),
            Reply::HangUp => Ok(0),
            Reply::Error(kind) => Err(io::Error::from(*kind)),
        }
    }
}

/// Lock held on behalf of a simulated other process.
#[derive(Debug)]
pub struct LockGuard {
    ports: MockPorts,
    path: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.ports.unlock(&self.path);
    }
}
