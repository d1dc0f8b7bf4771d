//! Scry Server - Standalone headless server for Scry.
//!
//! This binary serves the SSDP/UPnP scan endpoints as a background daemon:
//! each HTTP request triggers one discovery run on the local network and
//! returns the resulting device records as JSON.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scry_core::{start_server, AppState};
use tokio::signal;

use crate::config::ServerConfig;

/// Scry Server - Headless SSDP/UPnP device scan server.
#[derive(Parser, Debug)]
#[command(name = "scry-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SCRY_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "SCRY_BIND_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Scry Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }

    log::info!(
        "Configuration: bind_port={}, bulk_window={}s, targeted_window={}s",
        config.bind_port,
        config.bulk_window_secs,
        config.targeted_window_secs
    );

    // Build app state for the HTTP server
    let app_state = AppState::new(config.to_core_config());

    // Spawn the HTTP server; scans run on the main tokio runtime.
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP server started on port {}", config.bind_port);

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Scans are per-request and stateless - nothing to flush, just stop serving.
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
