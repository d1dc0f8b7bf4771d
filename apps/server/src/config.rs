//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `SCRY_BIND_PORT`
    pub bind_port: u16,

    /// Receive window in seconds for the bulk scans (all devices, root
    /// devices). Override: `SCRY_BULK_WINDOW_SECS`
    pub bulk_window_secs: u64,

    /// Receive window in seconds for the targeted scans (by URN, by UUID).
    /// Override: `SCRY_TARGETED_WINDOW_SECS`
    pub targeted_window_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            bulk_window_secs: 2,
            targeted_window_secs: 1,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SCRY_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("SCRY_BULK_WINDOW_SECS") {
            if let Ok(secs) = val.parse() {
                self.bulk_window_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("SCRY_TARGETED_WINDOW_SECS") {
            if let Ok(secs) = val.parse() {
                self.targeted_window_secs = secs;
            }
        }
    }

    /// Converts to scry-core's ScanConfig type.
    pub fn to_core_config(&self) -> scry_core::ScanConfig {
        scry_core::ScanConfig {
            bind_port: self.bind_port,
            bulk_window_secs: self.bulk_window_secs,
            targeted_window_secs: self.targeted_window_secs,
        }
    }
}
