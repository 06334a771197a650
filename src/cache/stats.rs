//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, loads and evictions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheSettings;

// == Cache Stats ==
/// Live counters of one operation cache.
///
/// Every counter only grows and may be bumped from any thread without
/// holding the cache's structural lock.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    total_load_time_nanos: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one stored result and the time it took to compute.
    pub fn record_load(&self, cost: Duration) {
        let nanos = u64::try_from(cost.as_nanos()).unwrap_or(u64::MAX);
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters into an immutable snapshot.
    pub fn snapshot(&self, entries: usize, estimated_memory_bytes: Option<u64>) -> StatsSnapshot {
        StatsSnapshot {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            load_count: self.loads.load(Ordering::Relaxed),
            total_load_time_nanos: self.total_load_time_nanos.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            entries,
            estimated_memory_bytes,
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of one cache's statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub hit_count: u64,
    pub miss_count: u64,
    pub load_count: u64,
    pub total_load_time_nanos: u64,
    pub eviction_count: u64,
    /// Entries held when the snapshot was taken
    pub entries: usize,
    /// Approximate size of the cached data, only when requested
    pub estimated_memory_bytes: Option<u64>,
}

impl StatsSnapshot {
    pub fn request_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hit_count, self.request_count())
    }

    /// Returns misses / (hits + misses), or 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        ratio(self.miss_count, self.request_count())
    }

    /// Mean computation time per stored result, 0 when nothing was loaded.
    pub fn average_load_time_nanos(&self) -> u64 {
        self.total_load_time_nanos
            .checked_div(self.load_count)
            .unwrap_or(0)
    }

    /// Sums every counter of two snapshots.
    pub fn plus(&self, other: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            hit_count: self.hit_count.saturating_add(other.hit_count),
            miss_count: self.miss_count.saturating_add(other.miss_count),
            load_count: self.load_count.saturating_add(other.load_count),
            total_load_time_nanos: self
                .total_load_time_nanos
                .saturating_add(other.total_load_time_nanos),
            eviction_count: self.eviction_count.saturating_add(other.eviction_count),
            entries: self.entries.saturating_add(other.entries),
            estimated_memory_bytes: match (self.estimated_memory_bytes, other.estimated_memory_bytes) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
            },
        }
    }

    /// Activity between an earlier snapshot and this one.
    pub fn minus(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            hit_count: self.hit_count.saturating_sub(earlier.hit_count),
            miss_count: self.miss_count.saturating_sub(earlier.miss_count),
            load_count: self.load_count.saturating_sub(earlier.load_count),
            total_load_time_nanos: self
                .total_load_time_nanos
                .saturating_sub(earlier.total_load_time_nanos),
            eviction_count: self.eviction_count.saturating_sub(earlier.eviction_count),
            entries: self.entries.saturating_sub(earlier.entries),
            estimated_memory_bytes: match (self.estimated_memory_bytes, earlier.estimated_memory_bytes) {
                (Some(a), b) => Some(a.saturating_sub(b.unwrap_or(0))),
                (None, _) => None,
            },
        }
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

// == Aggregated Stats ==
/// Statistics of one operation combined across every cache instance that
/// serves it.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedStats {
    pub settings: CacheSettings,
    pub instance_count: usize,
    pub combined: StatsSnapshot,
}

impl AggregatedStats {
    pub fn new(settings: CacheSettings, snapshot: StatsSnapshot) -> Self {
        Self {
            settings,
            instance_count: 1,
            combined: snapshot,
        }
    }

    /// Folds another aggregate of the same operation into this one.
    pub fn combine(&mut self, other: &AggregatedStats) {
        self.instance_count += other.instance_count;
        self.combined = self.combined.plus(&other.combined);
    }
}
