//! HTTP/JSON API layer.
//!
//! This module contains thin handlers over the discovery library, the
//! router construction and server startup functionality.

use std::sync::Arc;

use thiserror::Error;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the configured TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Scan defaults for the API layer. Per-request query parameters override
/// the windows.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Port the HTTP server binds to.
    pub bind_port: u16,
    /// Receive window in seconds for the bulk queries (all, root).
    pub bulk_window_secs: u64,
    /// Receive window in seconds for the targeted queries (URN, UUID).
    pub targeted_window_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            bulk_window_secs: 2,
            targeted_window_secs: 1,
        }
    }
}

/// Shared application state for the API layer.
///
/// Discovery itself is stateless, so this only carries configuration.
#[derive(Clone)]
pub struct AppState {
    /// Scan defaults.
    pub config: Arc<ScanConfig>,
}

impl AppState {
    /// Creates an `AppState` from a scan configuration.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Starts the HTTP server on the configured port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let port = state.config.bind_port;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    axum::serve(listener, app).await?;
    Ok(())
}
