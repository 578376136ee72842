use clap::Parser;
use devctl_cli::{Cli, commands, logging};
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();

    logging::init(config.log_level);
    debug!(log_level = %config.log_level, socket = %config.socket_path.display(), "Options");

    match commands::execute(config, cli.subcommand()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
