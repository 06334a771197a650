//! Cache Module
//!
//! Per-call result caching with LRU, FIFO, LFU and time-weighted LFU
//! eviction, TTL expiry, weak values and scoped registries.

mod context;
mod entry;
mod key;
mod memory;
mod method_cache;
mod operation;
mod queue;
mod registry;
mod settings;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use context::{CacheContext, CacheContextBuilder, CacheOwner, StatisticsReport, SINGLETON_GROUP};
pub use entry::{current_timestamp_ms, CacheEntry, CachedValue};
pub use key::{
    Argument, CacheKey, CallArgs, KeyDeriver, QualifiedKeyDeriver, StandardKeyDeriver,
    KEY_SEPARATOR,
};
pub use memory::{MemoryEstimator, ShallowEstimator};
pub use method_cache::MethodCache;
pub use operation::{CachedOperation, OperationId};
pub use queue::{EvictionQueue, Priority};
pub use registry::CacheRegistry;
pub use settings::{CacheSettings, CacheSettingsBuilder, EvictionStrategy, DEFAULT_MAX_ENTRIES};
pub use stats::{AggregatedStats, CacheStats, StatsSnapshot};
