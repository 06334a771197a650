//! Cache Context Module
//!
//! Process-wide cache handle, cache owners and the call dispatch path.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    AggregatedStats, CacheRegistry, CachedOperation, CallArgs, KeyDeriver, MemoryEstimator,
    MethodCache, ShallowEstimator, StandardKeyDeriver,
};

/// Statistics group holding the globally-shared caches.
pub const SINGLETON_GROUP: &str = "_singleton";

// == Statistics Report ==
/// Aggregated statistics of every reachable cache.
///
/// Grouped by owner kind, then by operation id. Globally-shared caches
/// appear once under [`SINGLETON_GROUP`].
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub generated_at: DateTime<Utc>,
    pub groups: BTreeMap<String, BTreeMap<String, AggregatedStats>>,
}

impl StatisticsReport {
    /// Stats of one operation within one group.
    pub fn get(&self, group: &str, operation: &str) -> Option<&AggregatedStats> {
        self.groups.get(group)?.get(operation)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn merge(&mut self, group: &str, stats: BTreeMap<String, AggregatedStats>) {
        let target = self.groups.entry(group.to_string()).or_default();
        for (operation, aggregated) in stats {
            match target.get_mut(&operation) {
                Some(existing) => existing.combine(&aggregated),
                None => {
                    target.insert(operation, aggregated);
                }
            }
        }
    }
}

// == Cache Context ==
struct ContextInner {
    singleton: Arc<CacheRegistry>,
    deriver: Arc<dyn KeyDeriver>,
    estimator: Arc<dyn MemoryEstimator>,
    owners: Mutex<Vec<TrackedOwner>>,
    track_owners: AtomicBool,
}

/// Weak handle on an owner's registry, for statistics.
struct TrackedOwner {
    kind: Arc<str>,
    registry: Weak<CacheRegistry>,
}

impl TrackedOwner {
    fn is_live(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

/// Process-wide cache handle.
///
/// Holds the singleton registry, the key deriver and the memory estimator,
/// and hands out [`CacheOwner`]s. Create one at startup and clone it wherever
/// cached operations live; clones share all state.
#[derive(Clone)]
pub struct CacheContext {
    inner: Arc<ContextInner>,
}

impl CacheContext {
    /// Context with the standard key deriver, the shallow memory estimator
    /// and owner tracking enabled.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CacheContextBuilder {
        CacheContextBuilder::default()
    }

    // == Owners ==
    /// Creates an owner with its own private registry.
    ///
    /// `kind` names the owner type; statistics of owners of the same kind
    /// are summed.
    pub fn owner(&self, kind: impl AsRef<str>) -> CacheOwner {
        let kind: Arc<str> = Arc::from(kind.as_ref());
        let registry = Arc::new(CacheRegistry::new());

        if self.inner.track_owners.load(Ordering::Relaxed) {
            let mut owners = self.inner.owners.lock();
            owners.retain(TrackedOwner::is_live);
            owners.push(TrackedOwner {
                kind: Arc::clone(&kind),
                registry: Arc::downgrade(&registry),
            });
        }

        CacheOwner {
            kind,
            registry,
            context: self.clone(),
        }
    }

    /// Turns tracking of newly created owners on or off.
    ///
    /// Turning it off forgets every tracked owner.
    pub fn set_track_owners(&self, track: bool) {
        self.inner.track_owners.store(track, Ordering::Relaxed);
        if !track {
            self.inner.owners.lock().clear();
        }
    }

    pub fn tracks_owners(&self) -> bool {
        self.inner.track_owners.load(Ordering::Relaxed)
    }

    /// Forgets owners that have been dropped. Returns how many were removed.
    ///
    /// Creating an owner and walking the owners also prune.
    pub fn prune_dropped_owners(&self) -> usize {
        let mut owners = self.inner.owners.lock();
        let before = owners.len();
        owners.retain(TrackedOwner::is_live);
        before - owners.len()
    }

    /// Number of tracked owners, dropped ones included until pruned.
    pub fn tracked_owner_count(&self) -> usize {
        self.inner.owners.lock().len()
    }

    /// The process-wide registry of globally-shared operations.
    pub fn singleton_registry(&self) -> &Arc<CacheRegistry> {
        &self.inner.singleton
    }

    pub fn key_deriver(&self) -> &dyn KeyDeriver {
        self.inner.deriver.as_ref()
    }

    /// Live registries of tracked owners. Dropped owners are forgotten on
    /// the way; the owner lock is released before the registries are used.
    fn live_owners(&self) -> Vec<(Arc<str>, Arc<CacheRegistry>)> {
        let mut owners = self.inner.owners.lock();
        let mut live = Vec::with_capacity(owners.len());
        owners.retain(|owner| match owner.registry.upgrade() {
            Some(registry) => {
                live.push((Arc::clone(&owner.kind), registry));
                true
            }
            None => false,
        });
        live
    }

    // == Statistics ==
    /// Aggregates statistics over every live tracked owner and the
    /// singleton registry.
    ///
    /// Dropped owners are skipped. Memory estimation is opt-in because it
    /// walks every cached value.
    pub fn statistics(&self, estimate_memory: bool) -> StatisticsReport {
        let estimator = estimate_memory.then(|| self.inner.estimator.as_ref());
        let mut report = StatisticsReport {
            generated_at: Utc::now(),
            groups: BTreeMap::new(),
        };

        for (kind, registry) in self.live_owners() {
            let stats = registry.statistics(estimator);
            if !stats.is_empty() {
                report.merge(&kind, stats);
            }
        }

        if !self.inner.singleton.is_empty() {
            report.merge(SINGLETON_GROUP, self.inner.singleton.statistics(estimator));
        }

        report
    }

    // == Memory Pressure ==
    /// Clears weak-held values in the singleton registry and in every live
    /// tracked owner. Returns the number of values cleared.
    pub fn reclaim_weak_values(&self) -> usize {
        let cleared = self.inner.singleton.reclaim_weak_values()
            + self
                .live_owners()
                .iter()
                .map(|(_, registry)| registry.reclaim_weak_values())
                .sum::<usize>();
        info!(cleared, "Reclaimed weak cache values");
        cleared
    }

    /// Removes expired entries from every reachable cache.
    pub fn purge_expired(&self) -> usize {
        let purged = self.inner.singleton.purge_expired()
            + self
                .live_owners()
                .iter()
                .map(|(_, registry)| registry.purge_expired())
                .sum::<usize>();
        debug!(purged, "Purged expired cache entries");
        purged
    }
}

impl Default for CacheContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheContext")
            .field("singleton_caches", &self.inner.singleton.len())
            .field("tracked_owners", &self.tracked_owner_count())
            .field("track_owners", &self.tracks_owners())
            .finish()
    }
}

// == Context Builder ==
/// Builder for [`CacheContext`].
pub struct CacheContextBuilder {
    deriver: Arc<dyn KeyDeriver>,
    estimator: Arc<dyn MemoryEstimator>,
    track_owners: bool,
}

impl Default for CacheContextBuilder {
    fn default() -> Self {
        Self {
            deriver: Arc::new(StandardKeyDeriver),
            estimator: Arc::new(ShallowEstimator),
            track_owners: true,
        }
    }
}

impl CacheContextBuilder {
    /// Replaces the key deriver used by every owner of the context.
    pub fn key_deriver(mut self, deriver: impl KeyDeriver + 'static) -> Self {
        self.deriver = Arc::new(deriver);
        self
    }

    pub fn memory_estimator(mut self, estimator: impl MemoryEstimator + 'static) -> Self {
        self.estimator = Arc::new(estimator);
        self
    }

    pub fn track_owners(mut self, track: bool) -> Self {
        self.track_owners = track;
        self
    }

    pub fn build(self) -> CacheContext {
        CacheContext {
            inner: Arc::new(ContextInner {
                singleton: Arc::new(CacheRegistry::new()),
                deriver: self.deriver,
                estimator: self.estimator,
                owners: Mutex::new(Vec::new()),
                track_owners: AtomicBool::new(self.track_owners),
            }),
        }
    }
}

// == Cache Owner ==
/// A caching scope: one instance of a service whose operations are cached.
///
/// Operations not marked globally shared are cached privately per owner.
/// Clones share the same private registry.
#[derive(Clone)]
pub struct CacheOwner {
    kind: Arc<str>,
    registry: Arc<CacheRegistry>,
    context: CacheContext,
}

impl CacheOwner {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    /// The owner's private registry.
    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    /// Registry serving `operation`: the singleton one for globally-shared
    /// operations, the private one otherwise.
    fn registry_for(&self, operation: &CachedOperation) -> &CacheRegistry {
        if operation.settings().globally_shared() {
            self.context.inner.singleton.as_ref()
        } else {
            self.registry.as_ref()
        }
    }

    fn key_for(&self, operation: &CachedOperation, args: &CallArgs) -> String {
        self.context.inner.deriver.derive(operation.id(), args)
    }

    /// Cache of `operation` in the scope its settings select.
    pub fn method_cache(&self, operation: &CachedOperation) -> Arc<MethodCache> {
        self.registry_for(operation).get_or_create(operation)
    }

    // == Invoke ==
    /// Returns the cached result of `operation(args)`, computing and storing
    /// it on a miss.
    ///
    /// `compute` runs only on a miss. Its error is returned unchanged and
    /// nothing is cached for the call.
    pub fn invoke<T, E, F>(&self, operation: &CachedOperation, args: &CallArgs, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let key = self.key_for(operation, args);
        let cache = self.method_cache(operation);

        if let Some(entry) = cache.get(&key) {
            match entry.value() {
                Ok(value) => match value.downcast_ref::<T>() {
                    Some(result) => {
                        debug!(operation = %operation.id(), key = %key, "Cache hit");
                        return Ok(result.clone());
                    }
                    None => warn!(
                        operation = %operation.id(),
                        key = %key,
                        "Cached value has a different type, recomputing"
                    ),
                },
                Err(e) => debug!(operation = %operation.id(), error = %e, "Weak value reclaimed, recomputing"),
            }
        }

        let started = Instant::now();
        let result = compute()?;
        let cost = started.elapsed();

        cache.put(key, Arc::new(result.clone()), cost);
        debug!(operation = %operation.id(), cost_us = cost.as_micros() as u64, "Cached new result");
        Ok(result)
    }

    /// [`invoke`](Self::invoke) for computations that cannot fail.
    pub fn call<T, F>(&self, operation: &CachedOperation, args: &CallArgs, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.invoke::<T, Infallible, _>(operation, args, || Ok(compute())) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    // == Invalidate ==
    /// Drops the cached result of `operation(args)`, in the scope the
    /// operation's settings select. Returns true if an entry was removed.
    pub fn invalidate(&self, operation: &CachedOperation, args: &CallArgs) -> bool {
        let key = self.key_for(operation, args);
        self.registry_for(operation).invalidate(operation.id(), &key)
    }

    /// Drops every cached result of `operation`.
    pub fn invalidate_all(&self, operation: &CachedOperation) {
        self.registry_for(operation).invalidate_all(operation.id());
    }

    /// Statistics of this owner's private caches.
    pub fn statistics(&self, estimate_memory: bool) -> BTreeMap<String, AggregatedStats> {
        let estimator = estimate_memory.then(|| self.context.inner.estimator.as_ref());
        self.registry.statistics(estimator)
    }
}

impl fmt::Debug for CacheOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOwner")
            .field("kind", &self.kind)
            .field("caches", &self.registry.len())
            .finish()
    }
}
