//! HTTP route handlers.
//!
//! All handlers are thin - they validate query parameters, delegate to the
//! discovery library and hand the outcome to the response helpers.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_success, devices_response};
use crate::api::AppState;
use crate::discovery;
use crate::error::{ScanError, ScanResult};
use crate::APP_NAME;

/// Caps the per-request receive window so one HTTP call cannot pin a
/// worker for an arbitrary time. The discovery engine itself is unchecked;
/// this guard belongs to the serving surface.
const MAX_WINDOW_SECS: u64 = 60;

/// Common query parameters of the scan endpoints.
#[derive(Deserialize)]
struct ScanParams {
    /// Receive window in seconds; defaults are per query mode.
    timeout: Option<u64>,
    /// MX reply-delay hint for devices, in seconds; defaults to the window.
    mx: Option<u64>,
}

impl ScanParams {
    fn window(&self, default_secs: u64) -> ScanResult<Duration> {
        let secs = self.timeout.unwrap_or(default_secs);
        if secs == 0 || secs > MAX_WINDOW_SECS {
            return Err(ScanError::InvalidRequest(format!(
                "timeout must be between 1 and {} seconds",
                MAX_WINDOW_SECS
            )));
        }
        Ok(Duration::from_secs(secs))
    }
}

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/devices", get(list_all_devices))
        .route("/api/devices/root", get(list_root_devices))
        .route("/api/devices/urn/{urn}", get(list_devices_by_urn))
        .route("/api/devices/uuid/{uuid}", get(get_device_by_uuid))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
async fn health_check(State(state): State<AppState>) -> Response {
    api_success(json!({
        "status": "ok",
        "service": APP_NAME,
        "defaults": {
            "bulkWindowSecs": state.config.bulk_window_secs,
            "targetedWindowSecs": state.config.targeted_window_secs
        }
    }))
}

/// Every SSDP reply on the network, sorted, undeduplicated, no descriptions.
async fn list_all_devices(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
) -> ScanResult<Response> {
    let window = params.window(state.config.bulk_window_secs)?;
    let devices = discovery::get_all_devices(window, params.mx).await?;
    Ok(devices_response(devices))
}

/// Root devices only, one per UUID, each with its description.
async fn list_root_devices(
    State(state): State<AppState>,
    Query(params): Query<ScanParams>,
) -> ScanResult<Response> {
    let window = params.window(state.config.bulk_window_secs)?;
    let devices = discovery::get_all_root_devices(window, params.mx).await?;
    Ok(devices_response(devices))
}

/// Devices answering a custom URN search target, each with its description.
async fn list_devices_by_urn(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    Query(params): Query<ScanParams>,
) -> ScanResult<Response> {
    let window = params.window(state.config.targeted_window_secs)?;
    let devices = discovery::get_devices_by_urn(&urn, window, params.mx).await?;
    Ok(devices_response(devices))
}

/// The single device with the given UUID (a JSON object, not a list).
async fn get_device_by_uuid(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(params): Query<ScanParams>,
) -> ScanResult<Response> {
    let window = params.window(state.config.targeted_window_secs)?;
    let device = discovery::get_device_by_uuid(&uuid, window, params.mx).await?;
    Ok(devices_response(device))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_zero_and_oversized_timeouts() {
        let zero = ScanParams {
            timeout: Some(0),
            mx: None,
        };
        assert!(zero.window(2).is_err());

        let oversized = ScanParams {
            timeout: Some(MAX_WINDOW_SECS + 1),
            mx: None,
        };
        assert!(oversized.window(2).is_err());
    }

    #[test]
    fn window_falls_back_to_mode_default() {
        let params = ScanParams {
            timeout: None,
            mx: None,
        };
        assert_eq!(params.window(2).unwrap(), Duration::from_secs(2));
    }
}
