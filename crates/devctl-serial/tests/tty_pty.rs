//! Tty backend behaviour against a pseudo-terminal.
//!
//! The test holds the pty master and plays the microcontroller; the
//! transport talks to the slave side exactly as it would to a USB adapter.

#![cfg(target_os = "linux")]

use devctl_core::constants::RESPONSE_BUFFER_SIZE;
use devctl_serial::{
    LineConfig, LineConfigError, SerialBackend, SerialLink, SerialTransport, TransportError,
    TtyBackend,
};
use nix::fcntl::OFlag;
use nix::pty::{PtyMaster, grantpt, posix_openpt, ptsname_r, unlockpt};
use serialport::DataBits;
use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

const REQUEST: &[u8] = b"{\"action\":\"on\",\"pin\":5}\n";
const REPLY: &[u8] = b"{\"response\":0,\"msg\":\"Pin was turned on\"}\n";

fn open_pty() -> (PtyMaster, String) {
    let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).unwrap();
    grantpt(&master).unwrap();
    unlockpt(&master).unwrap();
    let slave = ptsname_r(&master).unwrap();
    (master, slave)
}

/// Read from the master until a full request line arrived.
fn read_request(master: &mut PtyMaster) -> Vec<u8> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 64];
    while !request.ends_with(b"\n") {
        let read = master.read(&mut chunk).unwrap();
        assert!(read > 0, "pty closed before the request arrived");
        request.extend_from_slice(&chunk[..read]);
    }
    request
}

fn transact(slave: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
    SerialTransport::new(TtyBackend)
        .transact::<RESPONSE_BUFFER_SIZE>(slave, REQUEST, timeout)
        .map(|reply| reply.to_vec())
}

#[test]
fn test_configure_applies_every_setting() {
    let (_master, slave) = open_pty();
    let mut link = TtyBackend
        .lock_exclusive(TtyBackend.open(&slave).unwrap())
        .unwrap();

    let line = LineConfig::device_default().with_read_timeout(Duration::from_secs(2));
    link.configure(&line).unwrap();

    let settings = link.settings().unwrap();
    assert_eq!(settings.input_baud, Some(9600));
    assert_eq!(settings.output_baud, Some(9600));
    assert_eq!(settings.data_bits, Some(DataBits::Eight));
    assert!(!settings.echo);
    assert!(!settings.hardware_flow);
    assert!(!settings.software_flow);
    assert_eq!(settings.vtime, 20);
    assert_eq!(settings.vmin, 0);
    assert!(line.verify(&settings).is_ok());
}

#[test]
fn test_unsupported_baud_rate_is_rejected() {
    let (_master, slave) = open_pty();
    let mut link = TtyBackend
        .lock_exclusive(TtyBackend.open(&slave).unwrap())
        .unwrap();

    let line = LineConfig {
        baud_rate: 31_250,
        ..LineConfig::device_default()
    };
    assert!(matches!(
        link.configure(&line),
        Err(LineConfigError::UnsupportedBaudRate(31_250))
    ));
}

#[test]
fn test_reply_from_device() {
    let (mut master, slave) = open_pty();

    let device = thread::spawn(move || {
        let request = read_request(&mut master);
        master.write_all(REPLY).unwrap();
        (master, request)
    });

    let reply = transact(&slave, Duration::from_secs(5)).unwrap();
    let (_master, request) = device.join().unwrap();

    assert_eq!(request, REQUEST);
    assert_eq!(reply, REPLY);
}

#[test]
fn test_silent_device_times_out() {
    let (_master, slave) = open_pty();
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let err = transact(&slave, timeout).unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "unexpected error: {err:?}");
    assert!(elapsed >= Duration::from_millis(900), "gave up after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "waited {elapsed:?}");
}

#[test]
fn test_hang_up_is_not_a_timeout() {
    let (mut master, slave) = open_pty();

    let device = thread::spawn(move || {
        read_request(&mut master);
        drop(master);
    });

    let timeout = Duration::from_secs(5);
    let started = Instant::now();
    let err = transact(&slave, timeout).unwrap_err();
    device.join().unwrap();

    // Linux hangs the slave up when the master closes; depending on timing
    // the read sees end of file or EIO, never a timeout.
    assert!(
        matches!(
            err,
            TransportError::Disconnected { .. } | TransportError::ReadFailed { .. }
        ),
        "unexpected error: {err:?}"
    );
    assert!(!err.is_timeout());
    assert!(started.elapsed() < timeout);
}

#[test]
fn test_lock_released_after_reply() {
    let (mut master, slave) = open_pty();

    let device = thread::spawn(move || {
        read_request(&mut master);
        master.write_all(REPLY).unwrap();
        master
    });
    transact(&slave, Duration::from_secs(5)).unwrap();
    let _master = device.join().unwrap();

    let handle = TtyBackend.open(&slave).unwrap();
    assert!(TtyBackend.lock_exclusive(handle).is_ok());
}
