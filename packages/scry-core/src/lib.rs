//! Scry Core - shared library for Scry.
//!
//! This crate provides the core functionality for Scry, an SSDP/UPnP
//! device scanner for local networks: it multicasts an M-SEARCH request,
//! collects the unicast replies within a response window, optionally
//! enriches each reply with the device's XML description document and
//! presents the results in memory or over a JSON API.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`discovery`]: SSDP discovery engine, reply parsing and the query modes
//! - [`description`]: device description fetching and XML conversion
//! - [`api`]: HTTP/JSON presentation layer (axum)
//! - [`error`]: centralized error types
//!
//! Discovery is stateless by design: every call owns its UDP socket and
//! reply list for its duration and shares nothing with concurrent calls.

#![warn(clippy::all)]

pub mod api;
pub mod description;
pub mod discovery;
pub mod error;

/// Service name used in log lines and the health endpoint.
pub const APP_NAME: &str = "Scry";

// Re-export commonly used types at the crate root
pub use api::{start_server, AppState, ScanConfig, ServerError};
pub use description::DescriptionNode;
pub use discovery::{
    get_all_devices, get_all_root_devices, get_device_by_uuid, get_devices_by_urn, DeviceRecord,
    DiscoveryError, DiscoveryResult, DEFAULT_BULK_WINDOW, DEFAULT_TARGETED_WINDOW,
};
pub use error::{ErrorCode, ScanError, ScanResult};
