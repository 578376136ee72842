//! Daemon settings.
//!
//! The log level is the syslog-style number `0..=7` the device firmware
//! tooling has always used (0 emergency through 7 debug). It is mapped onto
//! the nearest `tracing` level.

use devctl_rpc::default_socket_path;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unrecognized value for option 'log_level': {0} (expected 0..=7)")]
    InvalidLogLevel(String),
}

/// Syslog-style verbosity, `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogLevel(u8);

impl LogLevel {
    pub const MAX: u8 = 7;

    pub fn new(level: u8) -> Result<Self, ConfigError> {
        if level > Self::MAX {
            return Err(ConfigError::InvalidLogLevel(level.to_string()));
        }
        Ok(Self(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// `tracing` level shown at this verbosity.
    ///
    /// ```text
    /// 0..=3  emerg, alert, crit, err  -> ERROR
    /// 4      warning                  -> WARN
    /// 5..=6  notice, info             -> INFO
    /// 7      debug                    -> DEBUG
    /// ```
    pub fn level_filter(self) -> LevelFilter {
        match self.0 {
            0..=3 => LevelFilter::ERROR,
            4 => LevelFilter::WARN,
            5 | 6 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(6)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s
            .trim()
            .parse::<u8>()
            .map_err(|_| ConfigError::InvalidLogLevel(s.to_string()))?;
        Self::new(level)
    }
}

/// Settings resolved from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub socket_path: PathBuf,
    pub log_level: LogLevel,
}

impl Config {
    pub fn new(socket_path: Option<PathBuf>, log_level: LogLevel) -> Self {
        Self {
            socket_path: socket_path.unwrap_or_else(default_socket_path),
            log_level,
        }
    }
}
