//! Cache Settings Module
//!
//! Per-operation cache configuration and eviction strategy selection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CacheError, Result};

/// Default capacity of an operation cache.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

// == Eviction Strategy ==
/// Policy choosing which entry leaves a full cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvictionStrategy {
    /// Least recently used
    #[default]
    Lru,
    /// First in, first out
    Fifo,
    /// Least frequently used, oldest first on ties
    Lfu,
    /// Least `uses * (compute_cost + 1)`, oldest first on ties
    LfuTimecost,
}

impl EvictionStrategy {
    /// Whether a hit changes the entry's eviction priority.
    pub fn reorders_on_hit(self) -> bool {
        !matches!(self, EvictionStrategy::Fifo)
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionStrategy::Lru => "LRU",
            EvictionStrategy::Fifo => "FIFO",
            EvictionStrategy::Lfu => "LFU",
            EvictionStrategy::LfuTimecost => "LFU_TIMECOST",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "fifo" => Ok(EvictionStrategy::Fifo),
            "lfu" => Ok(EvictionStrategy::Lfu),
            "lfu_timecost" | "lfu-timecost" => Ok(EvictionStrategy::LfuTimecost),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown eviction strategy '{}'",
                other
            ))),
        }
    }
}

// == Cache Settings ==
/// Immutable cache configuration attached to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSettings {
    /// Time-to-live of each entry, zero = never expires
    #[serde(rename = "time_to_live_ms", serialize_with = "serialize_millis")]
    time_to_live: Duration,
    /// Maximum number of entries, always > 0
    max_entries: usize,
    /// Eviction policy used once the cache is full
    eviction: EvictionStrategy,
    /// Hold results in clearable slots that give way under memory pressure
    weak_values: bool,
    /// One process-wide cache instead of one per owner
    globally_shared: bool,
}

impl CacheSettings {
    /// Starts a builder with the default settings.
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn eviction(&self) -> EvictionStrategy {
        self.eviction
    }

    pub fn weak_values(&self) -> bool {
        self.weak_values
    }

    pub fn globally_shared(&self) -> bool {
        self.globally_shared
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            time_to_live: Duration::ZERO,
            max_entries: DEFAULT_MAX_ENTRIES,
            eviction: EvictionStrategy::Lru,
            weak_values: false,
            globally_shared: false,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    d: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(d.as_millis() as u64)
}

// == Builder ==
/// Validating builder for [`CacheSettings`].
#[derive(Debug, Clone, Default)]
pub struct CacheSettingsBuilder {
    settings: CacheSettings,
}

impl CacheSettingsBuilder {
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.settings.time_to_live = ttl;
        self
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.settings.max_entries = max_entries;
        self
    }

    pub fn eviction(mut self, eviction: EvictionStrategy) -> Self {
        self.settings.eviction = eviction;
        self
    }

    pub fn weak_values(mut self, weak_values: bool) -> Self {
        self.settings.weak_values = weak_values;
        self
    }

    pub fn globally_shared(mut self, globally_shared: bool) -> Self {
        self.settings.globally_shared = globally_shared;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    /// `CacheError::InvalidConfig` when `max_entries` is zero.
    pub fn build(self) -> Result<CacheSettings> {
        if self.settings.max_entries == 0 {
            warn!("Rejected cache settings with max_entries = 0");
            return Err(CacheError::InvalidConfig(
                "max_entries must be greater than 0".to_string(),
            ));
        }
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CacheSettings::builder().build().unwrap();
        assert_eq!(settings.time_to_live(), Duration::ZERO);
        assert_eq!(settings.max_entries(), DEFAULT_MAX_ENTRIES);
        assert_eq!(settings.eviction(), EvictionStrategy::Lru);
        assert!(!settings.weak_values());
        assert!(!settings.globally_shared());
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let result = CacheSettings::builder().max_entries(0).build();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_sets_every_field() {
        let settings = CacheSettings::builder()
            .time_to_live(Duration::from_millis(100))
            .max_entries(3)
            .eviction(EvictionStrategy::LfuTimecost)
            .weak_values(true)
            .globally_shared(true)
            .build()
            .unwrap();

        assert_eq!(settings.time_to_live(), Duration::from_millis(100));
        assert_eq!(settings.max_entries(), 3);
        assert_eq!(settings.eviction(), EvictionStrategy::LfuTimecost);
        assert!(settings.weak_values());
        assert!(settings.globally_shared());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("lru".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Lru);
        assert_eq!("FIFO".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Fifo);
        assert_eq!("Lfu".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Lfu);
        assert_eq!(
            "lfu_timecost".parse::<EvictionStrategy>().unwrap(),
            EvictionStrategy::LfuTimecost
        );
        assert!("random".parse::<EvictionStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serializes_upper_case() {
        let json = serde_json::to_string(&EvictionStrategy::LfuTimecost).unwrap();
        assert_eq!(json, "\"LFU_TIMECOST\"");
        assert_eq!(EvictionStrategy::LfuTimecost.to_string(), "LFU_TIMECOST");
    }

    #[test]
    fn test_only_fifo_ignores_hits() {
        assert!(!EvictionStrategy::Fifo.reorders_on_hit());
        assert!(EvictionStrategy::Lru.reorders_on_hit());
        assert!(EvictionStrategy::Lfu.reorders_on_hit());
        assert!(EvictionStrategy::LfuTimecost.reorders_on_hit());
    }
}
