//! Cache Registry Module
//!
//! Owns the operation caches of one scope and routes invalidation to them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{AggregatedStats, CachedOperation, MemoryEstimator, MethodCache, OperationId};

// == Cache Registry ==
/// Operation id -> cache map of one scope.
///
/// A scope is either a single owner or the whole process (the singleton
/// registry shared by every globally-shared operation).
#[derive(Debug, Default)]
pub struct CacheRegistry {
    caches: RwLock<HashMap<OperationId, Arc<MethodCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Get Or Create ==
    /// Returns the cache of `operation`, creating it on first use.
    ///
    /// Concurrent first calls all observe the same instance: the fast path
    /// takes a read lock, creation re-checks under the write lock.
    pub fn get_or_create(&self, operation: &CachedOperation) -> Arc<MethodCache> {
        if let Some(cache) = self.caches.read().get(operation.id()) {
            return Arc::clone(cache);
        }

        let mut caches = self.caches.write();
        let cache = caches.entry(operation.id().clone()).or_insert_with(|| {
            debug!(
                operation = %operation.id(),
                max_entries = operation.settings().max_entries(),
                eviction = %operation.settings().eviction(),
                "Created operation cache"
            );
            Arc::new(MethodCache::new(
                operation.id().clone(),
                operation.settings().clone(),
            ))
        });
        Arc::clone(cache)
    }

    /// Returns the cache of `operation` if it was ever used in this scope.
    pub fn get(&self, operation: &OperationId) -> Option<Arc<MethodCache>> {
        self.caches.read().get(operation).cloned()
    }

    // == Invalidate ==
    /// Removes one cached result. Returns true if an entry was removed.
    pub fn invalidate(&self, operation: &OperationId, key: &str) -> bool {
        self.get(operation)
            .map(|cache| cache.remove(key))
            .unwrap_or(false)
    }

    /// Empties the cache of `operation`; it stays registered and refills on
    /// later calls.
    pub fn invalidate_all(&self, operation: &OperationId) {
        if let Some(cache) = self.get(operation) {
            cache.clear();
        }
    }

    fn caches(&self) -> Vec<Arc<MethodCache>> {
        self.caches.read().values().cloned().collect()
    }

    // == Statistics ==
    /// Snapshots every cache in this scope, keyed by operation id.
    pub fn statistics(
        &self,
        estimator: Option<&dyn MemoryEstimator>,
    ) -> BTreeMap<String, AggregatedStats> {
        self.caches()
            .into_iter()
            .map(|cache| {
                let stats = AggregatedStats::new(cache.settings().clone(), cache.snapshot(estimator));
                (cache.operation().to_string(), stats)
            })
            .collect()
    }

    /// Clears weak-held values in every cache of this scope.
    pub fn reclaim_weak_values(&self) -> usize {
        self.caches()
            .iter()
            .map(|cache| cache.reclaim_weak_values())
            .sum()
    }

    /// Removes expired entries in every cache of this scope.
    pub fn purge_expired(&self) -> usize {
        self.caches().iter().map(|cache| cache.purge_expired()).sum()
    }

    /// Number of operation caches created so far.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }
}
