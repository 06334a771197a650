//! Method Cache Module
//!
//! Bounded per-operation store combining key lookup, eviction ordering and
//! lazy TTL expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{
    CacheEntry, CacheSettings, CacheStats, CachedValue, EvictionQueue, EvictionStrategy,
    MemoryEstimator, OperationId, Priority, StatsSnapshot,
};

// == Method Cache ==
/// Result cache of one operation within one scope.
///
/// Structural state (entries and eviction order) lives behind one mutex held
/// only for the duration of a single lookup, insert or removal. Statistics
/// are atomic counters updated outside that lock.
#[derive(Debug)]
pub struct MethodCache {
    operation: OperationId,
    settings: CacheSettings,
    state: Mutex<CacheState>,
    stats: CacheStats,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Key-entry storage
    entries: HashMap<String, Arc<CacheEntry>>,
    /// Eviction order
    queue: EvictionQueue,
    /// Next creation sequence number
    next_sequence: u64,
    /// Access clock driving LRU order
    clock: u64,
}

impl CacheState {
    /// Eviction priority of `entry` right now.
    fn priority_for(&mut self, entry: &CacheEntry, strategy: EvictionStrategy) -> Priority {
        let weight = match strategy {
            EvictionStrategy::Lru => {
                self.clock += 1;
                u128::from(self.clock)
            }
            other => entry.frequency_weight(other),
        };
        Priority::new(weight, entry.sequence())
    }

    fn remove(&mut self, key: &str) -> Option<Arc<CacheEntry>> {
        self.queue.remove(key);
        self.entries.remove(key)
    }
}

impl MethodCache {
    // == Constructor ==
    /// Creates an empty cache for `operation`.
    ///
    /// `settings` were validated when built, so `max_entries` is positive.
    pub fn new(operation: OperationId, settings: CacheSettings) -> Self {
        Self {
            operation,
            settings,
            state: Mutex::new(CacheState::default()),
            stats: CacheStats::new(),
        }
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // == Get ==
    /// Looks up a live entry.
    ///
    /// Expired entries are removed and reported as a miss. A hit bumps the
    /// entry's use count and then refreshes its eviction position.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let strategy = self.settings.eviction();
        let found = {
            let mut state = self.state.lock();
            match state.entries.get(key).cloned() {
                Some(entry) if entry.is_expired() => {
                    state.remove(key);
                    debug!(operation = %self.operation, key, "Expired entry removed");
                    None
                }
                Some(entry) => {
                    entry.increment_uses();
                    if strategy.reorders_on_hit() {
                        let priority = state.priority_for(&entry, strategy);
                        state.queue.touch(key, priority);
                    }
                    Some(entry)
                }
                None => None,
            }
        };

        if found.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        found
    }

    // == Put ==
    /// Stores a computed result, replacing any earlier value for `key`.
    ///
    /// When a new key arrives at a full cache the lowest-priority entry is
    /// evicted first, so the size never exceeds `max_entries`.
    pub fn put(&self, key: String, value: CachedValue, compute_cost: Duration) -> Arc<CacheEntry> {
        let strategy = self.settings.eviction();
        let (entry, evicted) = {
            let mut state = self.state.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;

            let entry = Arc::new(CacheEntry::new(
                key.clone(),
                value,
                self.settings.time_to_live(),
                compute_cost,
                self.settings.weak_values(),
                sequence,
            ));

            let mut evicted = None;
            if !state.entries.contains_key(&key) && state.entries.len() >= self.settings.max_entries() {
                if let Some(victim) = state.queue.evict_first() {
                    state.entries.remove(&victim);
                    evicted = Some(victim);
                }
            }

            let priority = state.priority_for(&entry, strategy);
            state.queue.touch(&key, priority);
            state.entries.insert(key, Arc::clone(&entry));
            (entry, evicted)
        };

        self.stats.record_load(compute_cost);
        if let Some(victim) = evicted {
            self.stats.record_eviction();
            debug!(operation = %self.operation, key = %victim, %strategy, "Evicted entry");
        }
        entry
    }

    // == Remove ==
    /// Invalidates one key. Returns true if an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }

    // == Clear ==
    /// Invalidates every key. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.queue.clear();
    }

    // == Purge Expired ==
    /// Removes all expired entries in one pass.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            state.remove(key);
        }
        expired_keys.len()
    }

    // == Reclaim Weak Values ==
    /// Clears every weak-held value, as under memory pressure.
    ///
    /// The cleared entries count as expired and leave on their next access.
    /// Returns the number of values cleared.
    pub fn reclaim_weak_values(&self) -> usize {
        if !self.settings.weak_values() {
            return 0;
        }
        self.entries_snapshot()
            .iter()
            .filter(|entry| entry.reclaim())
            .count()
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    fn entries_snapshot(&self) -> Vec<Arc<CacheEntry>> {
        self.state.lock().entries.values().cloned().collect()
    }

    // == Snapshot ==
    /// Point-in-time statistics, with an optional memory estimate.
    ///
    /// Without an estimator only the entry count is read. With one, the
    /// structural lock is held to copy the entry list and estimation runs
    /// without it. A failing estimator is logged and yields no estimate.
    pub fn snapshot(&self, estimator: Option<&dyn MemoryEstimator>) -> StatsSnapshot {
        match estimator {
            None => self.stats.snapshot(self.len(), None),
            Some(estimator) => {
                let entries = self.entries_snapshot();
                let estimated = self.estimate_memory(&entries, estimator);
                self.stats.snapshot(entries.len(), estimated)
            }
        }
    }

    fn estimate_memory(
        &self,
        entries: &[Arc<CacheEntry>],
        estimator: &dyn MemoryEstimator,
    ) -> Option<u64> {
        let mut total: u64 = 0;
        for entry in entries {
            // Reclaimed weak values occupy nothing
            let Ok(value) = entry.value() else { continue };
            match estimator.estimate(entry.key(), value.as_ref()) {
                Ok(bytes) => total += bytes as u64,
                Err(e) => {
                    warn!(operation = %self.operation, error = %e, "Unable to estimate cache size");
                    return None;
                }
            }
        }
        Some(total)
    }
}
