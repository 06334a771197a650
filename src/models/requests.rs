//! Request DTOs for the cache inspector API
//!
//! Defines the query parameters accepted by the inspector endpoints.

use serde::Deserialize;

/// Query string of the stats endpoint (GET /stats)
///
/// # Fields
/// - `memory`: Estimate memory usage of every cache (expensive)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    /// Overrides the configured memory estimation default
    #[serde(default)]
    pub memory: Option<bool>,
}

impl StatsQuery {
    /// Whether this request asks for memory estimation.
    pub fn estimate_memory(&self, default: bool) -> bool {
        self.memory.unwrap_or(default)
    }
}
