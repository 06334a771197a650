//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Path the cache inspector is mounted under
    pub inspector_path: String,
    /// Whether `/stats` estimates memory unless the query says otherwise
    pub estimate_memory: bool,
    /// Whether cache owners are tracked for statistics
    pub track_owners: bool,
    /// Wait limit of the operation lock, in milliseconds
    pub oplock_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `INSPECTOR_PATH` - Inspector mount path (default: `/_cache_inspector`)
    /// - `ESTIMATE_MEMORY` - Estimate memory in `/stats` by default (default: false)
    /// - `TRACK_OWNERS` - Track cache owners for statistics (default: true)
    /// - `OPLOCK_TIMEOUT_MS` - Operation lock wait limit (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            inspector_path: env::var("INSPECTOR_PATH")
                .ok()
                .filter(|p| p.starts_with('/') && p.len() > 1)
                .unwrap_or(defaults.inspector_path),
            estimate_memory: parse_var("ESTIMATE_MEMORY").unwrap_or(defaults.estimate_memory),
            track_owners: parse_var("TRACK_OWNERS").unwrap_or(defaults.track_owners),
            oplock_timeout_ms: parse_var("OPLOCK_TIMEOUT_MS").unwrap_or(defaults.oplock_timeout_ms),
        }
    }

    pub fn oplock_timeout(&self) -> Duration {
        Duration::from_millis(self.oplock_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            inspector_path: "/_cache_inspector".to_string(),
            estimate_memory: false,
            track_owners: true,
            oplock_timeout_ms: 5000,
        }
    }
}
