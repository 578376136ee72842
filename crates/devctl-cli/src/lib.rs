//! `devctld`: bridge daemon between the local bus and the microcontroller.
//!
//! - [`cli`]: command-line surface (`serve`, `call`, `pin`).
//! - [`config`]: resolved settings and the numeric log level.
//! - [`logging`]: `tracing` subscriber bootstrap.
//! - [`commands`]: what each subcommand does.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use cli::{Cli, Commands};
pub use config::{Config, ConfigError, LogLevel};
