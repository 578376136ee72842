//! Serial backend for real tty devices.
//!
//! Devices are opened with `O_NOCTTY` so the daemon never acquires a
//! controlling terminal, locked with a non-blocking `flock(LOCK_EX)`, and
//! configured through termios. Reads wait with `poll` so that a silent
//! device and a hung-up device can be told apart.

use crate::error::LineConfigError;
use crate::line::{LineConfig, LineSettings};
use crate::traits::{SerialBackend, SerialLink};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg, OFlag};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices, Termios,
};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use tracing::trace;

const BAUD_RATES: &[(u32, BaudRate)] = &[
    (1200, BaudRate::B1200),
    (2400, BaudRate::B2400),
    (4800, BaudRate::B4800),
    (9600, BaudRate::B9600),
    (19_200, BaudRate::B19200),
    (38_400, BaudRate::B38400),
    (57_600, BaudRate::B57600),
    (115_200, BaudRate::B115200),
    (230_400, BaudRate::B230400),
];

/// Platform speed constant for `rate`.
pub fn baud_rate(rate: u32) -> Option<BaudRate> {
    BAUD_RATES
        .iter()
        .find(|(value, _)| *value == rate)
        .map(|(_, baud)| *baud)
}

/// Numeric value of a platform speed constant.
pub fn baud_value(baud: BaudRate) -> Option<u32> {
    BAUD_RATES
        .iter()
        .find(|(_, constant)| *constant == baud)
        .map(|(value, _)| *value)
}

/// Backend opening device files directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyBackend;

impl SerialBackend for TtyBackend {
    type Handle = File;
    type Link = TtyLink;

    fn open(&self, path: &str) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
    }

    fn lock_exclusive(&self, handle: File) -> io::Result<TtyLink> {
        match Flock::lock(handle, FlockArg::LockExclusiveNonblock) {
            Ok(file) => Ok(TtyLink { file }),
            Err((_file, errno)) => Err(io::Error::from(errno)),
        }
    }
}

/// A locked tty. Dropping it unlocks and closes the device.
pub struct TtyLink {
    file: Flock<File>,
}

impl std::fmt::Debug for TtyLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyLink").field("file", &*self.file).finish()
    }
}

impl TtyLink {
    /// Settings the OS currently reports for this device.
    pub fn settings(&self) -> Result<LineSettings, LineConfigError> {
        let current = termios::tcgetattr(self.file.as_fd())
            .map_err(|errno| LineConfigError::Query(io::Error::from(errno)))?;
        Ok(settings_of(&current))
    }
}

impl SerialLink for TtyLink {
    fn configure(&mut self, line: &LineConfig) -> Result<(), LineConfigError> {
        let mut tty = termios::tcgetattr(self.file.as_fd())
            .map_err(|errno| LineConfigError::Query(io::Error::from(errno)))?;

        apply(&mut tty, line)?;
        termios::tcsetattr(self.file.as_fd(), SetArg::TCSANOW, &tty)
            .map_err(|errno| LineConfigError::Apply(io::Error::from(errno)))?;

        // tcsetattr succeeds if any setting was applied
        line.verify(&self.settings()?)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let ready = loop {
            let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(millis)) {
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(io::Error::from(errno)),
                Ok(ready) => break ready,
            }
        };

        if ready == 0 {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no data before read timeout",
            ));
        }
        let read = self.file.read(buf)?;
        trace!(read, "tty read");
        Ok(read)
    }
}

fn apply(tty: &mut Termios, line: &LineConfig) -> Result<(), LineConfigError> {
    let cflag = &mut tty.control_flags;
    cflag.remove(ControlFlags::CSIZE);
    cflag.insert(match line.data_bits {
        DataBits::Five => ControlFlags::CS5,
        DataBits::Six => ControlFlags::CS6,
        DataBits::Seven => ControlFlags::CS7,
        DataBits::Eight => ControlFlags::CS8,
    });
    match line.parity {
        Parity::None => cflag.remove(ControlFlags::PARENB | ControlFlags::PARODD),
        Parity::Even => {
            cflag.insert(ControlFlags::PARENB);
            cflag.remove(ControlFlags::PARODD);
        }
        Parity::Odd => cflag.insert(ControlFlags::PARENB | ControlFlags::PARODD),
    }
    cflag.set(ControlFlags::CSTOPB, line.stop_bits == StopBits::Two);
    cflag.set(
        ControlFlags::CRTSCTS,
        line.flow_control == FlowControl::Hardware,
    );
    cflag.insert(ControlFlags::CREAD | ControlFlags::CLOCAL);

    let lflag = &mut tty.local_flags;
    lflag.set(LocalFlags::ICANON, line.canonical);
    lflag.set(LocalFlags::ECHO, line.echo);
    lflag.remove(LocalFlags::ECHOE | LocalFlags::ECHONL | LocalFlags::ISIG);

    let software = InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY;
    tty.input_flags
        .set(software, line.flow_control == FlowControl::Software);
    tty.input_flags.remove(
        InputFlags::IGNBRK
            | InputFlags::BRKINT
            | InputFlags::PARMRK
            | InputFlags::ISTRIP
            | InputFlags::INLCR
            | InputFlags::IGNCR
            | InputFlags::ICRNL,
    );
    tty.output_flags.remove(OutputFlags::OPOST | OutputFlags::ONLCR);

    tty.control_chars[SpecialCharacterIndices::VTIME as usize] = line.vtime();
    tty.control_chars[SpecialCharacterIndices::VMIN as usize] = line.min_bytes;

    let baud = baud_rate(line.baud_rate)
        .ok_or(LineConfigError::UnsupportedBaudRate(line.baud_rate))?;
    termios::cfsetispeed(tty, baud)
        .and_then(|()| termios::cfsetospeed(tty, baud))
        .map_err(|errno| LineConfigError::Apply(io::Error::from(errno)))
}

fn settings_of(tty: &Termios) -> LineSettings {
    let cflag = tty.control_flags;
    let size = cflag & ControlFlags::CSIZE;
    let data_bits = [
        (ControlFlags::CS5, DataBits::Five),
        (ControlFlags::CS6, DataBits::Six),
        (ControlFlags::CS7, DataBits::Seven),
        (ControlFlags::CS8, DataBits::Eight),
    ]
    .into_iter()
    .find(|(flag, _)| size == *flag)
    .map(|(_, bits)| bits);

    let parity = match (
        cflag.contains(ControlFlags::PARENB),
        cflag.contains(ControlFlags::PARODD),
    ) {
        (false, _) => Parity::None,
        (true, false) => Parity::Even,
        (true, true) => Parity::Odd,
    };

    LineSettings {
        input_baud: baud_value(termios::cfgetispeed(tty)),
        output_baud: baud_value(termios::cfgetospeed(tty)),
        data_bits,
        parity,
        stop_bits: if cflag.contains(ControlFlags::CSTOPB) {
            StopBits::Two
        } else {
            StopBits::One
        },
        hardware_flow: cflag.contains(ControlFlags::CRTSCTS),
        software_flow: tty
            .input_flags
            .intersects(InputFlags::IXON | InputFlags::IXOFF),
        echo: tty.local_flags.contains(LocalFlags::ECHO),
        canonical: tty.local_flags.contains(LocalFlags::ICANON),
        vtime: tty.control_chars[SpecialCharacterIndices::VTIME as usize],
        vmin: tty.control_chars[SpecialCharacterIndices::VMIN as usize],
    }
}
