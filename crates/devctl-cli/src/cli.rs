//! Command-line interface using clap derive macros.

use crate::config::{Config, LogLevel};
use clap::{Parser, Subcommand};
use devctl_core::PinAction;
use std::path::PathBuf;

/// devctld: control microcontroller pins over a local bus.
#[derive(Parser, Debug)]
#[command(name = "devctld")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Bus socket path [default: $XDG_RUNTIME_DIR/devctl/devctl.sock]
    #[arg(long, env = "DEVCTL_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Log verbosity, syslog style: 0 (emergencies only) to 7 (debug).
    #[arg(long, env = "DEVCTL_LOG_LEVEL", default_value_t = LogLevel::default(), global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the daemon (the default).
    Serve,

    /// Send one request to a running daemon and print the result.
    Call {
        /// Bus object, e.g. "devctl".
        object: String,

        /// Method name, e.g. "turn_on_pin".
        method: String,

        /// Arguments as a JSON object, e.g. '{"device":"/dev/ttyUSB0","pin":5}'.
        params: Option<String>,
    },

    /// Switch a pin through a running daemon.
    Pin {
        /// "on" or "off".
        action: PinAction,

        /// Device path, as listed by `list_devices`.
        device: String,

        /// Pin number.
        pin: u32,
    },
}

impl Cli {
    pub fn config(&self) -> Config {
        Config::new(self.socket.clone(), self.log_level)
    }

    pub fn subcommand(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["devctld"]).unwrap();
        assert_eq!(cli.subcommand(), Commands::Serve);
    }

    #[test]
    fn test_call_arguments() {
        let cli = Cli::try_parse_from([
            "devctld",
            "call",
            "devctl",
            "turn_on_pin",
            r#"{"device":"/dev/ttyUSB0","pin":5}"#,
            "--socket",
            "/tmp/bus.sock",
            "--log-level",
            "7",
        ])
        .unwrap();

        assert_eq!(
            cli.subcommand(),
            Commands::Call {
                object: "devctl".into(),
                method: "turn_on_pin".into(),
                params: Some(r#"{"device":"/dev/ttyUSB0","pin":5}"#.into()),
            }
        );
        let config = cli.config();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/bus.sock"));
        assert_eq!(config.log_level.value(), 7);
    }

    #[test]
    fn test_pin_shortcut() {
        let cli = Cli::try_parse_from(["devctld", "pin", "off", "/dev/ttyUSB1", "12"]).unwrap();
        assert_eq!(
            cli.subcommand(),
            Commands::Pin {
                action: PinAction::Off,
                device: "/dev/ttyUSB1".into(),
                pin: 12,
            }
        );
    }

    #[test]
    fn test_pin_shortcut_rejects_unknown_action() {
        let err = Cli::try_parse_from(["devctld", "pin", "toggle", "/dev/ttyUSB1", "12"])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown pin action: toggle"));
    }

    #[test]
    fn test_log_level_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["devctld", "--log-level", "8"]).is_err());
    }
}
