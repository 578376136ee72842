//! Subcommand implementations.

use crate::cli::Commands;
use crate::config::Config;
use anyhow::{Context, Result, bail};
use devctl_core::PinAction;
use devctl_core::constants::OBJECT_NAME;
use devctl_rpc::{BusClient, BusServer, BusServerConfig, RequestDispatcher, devctl_router};
use serde_json::{Value, json};
use std::path::Path;
use tracing::{error, info};

/// Run `command` with the resolved configuration.
pub async fn execute(config: Config, command: Commands) -> Result<()> {
    match command {
        Commands::Serve => serve(&config).await,
        Commands::Call {
            object,
            method,
            params,
        } => {
            let result = call(&config.socket_path, &object, &method, params.as_deref()).await?;
            print_result(&result)
        }
        Commands::Pin {
            action,
            device,
            pin,
        } => {
            let result = switch_pin(&config.socket_path, action, &device, pin).await?;
            print_result(&result)
        }
    }
}

fn print_result(result: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Serve the `devctl` object until SIGINT or SIGTERM.
pub async fn serve(config: &Config) -> Result<()> {
    info!(version = devctl_core::VERSION, "Starting devctld");
    let server = BusServer::bind(
        BusServerConfig::with_socket_path(&config.socket_path),
        devctl_router(),
        RequestDispatcher::system(),
    )
    .await
    .context("Failed to start bus server")?;

    server.run_until(shutdown_signal()).await?;
    info!("Cleaning up resources and exiting");
    Ok(())
}

/// Issue one call against the daemon at `socket`.
pub async fn call(
    socket: &Path,
    object: &str,
    method: &str,
    params: Option<&str>,
) -> Result<Value> {
    let params = match params {
        Some(raw) => serde_json::from_str::<Value>(raw).context("params must be valid JSON")?,
        None => Value::Object(Default::default()),
    };
    if !params.is_object() {
        bail!("params must be a JSON object");
    }

    let mut client = BusClient::connect(socket).await?;
    Ok(client.call(object, method, params).await?)
}

/// Ask the daemon at `socket` to switch `pin` on `device`.
pub async fn switch_pin(
    socket: &Path,
    action: PinAction,
    device: &str,
    pin: u32,
) -> Result<Value> {
    let params = json!({"device": device, "pin": pin});
    let mut client = BusClient::connect(socket).await?;
    Ok(client.call(OBJECT_NAME, action.method(), params).await?)
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
    info!("Got signal to exit");
}
