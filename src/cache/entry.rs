//! Cache Entry Module
//!
//! Defines the record wrapping one cached result with its TTL and usage data.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::cache::EvictionStrategy;
use crate::error::{CacheError, Result};

/// Type-erased cached result, shared between the cache and its callers.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

// == Value Slot ==
/// How an entry holds its result.
enum ValueSlot {
    /// Held until the entry leaves the cache
    Hard(CachedValue),
    /// Held until the entry leaves the cache or memory pressure clears it
    Weak(RwLock<Option<CachedValue>>),
}

// == Cache Entry ==
/// A single cached result with creation time, TTL and usage metadata.
///
/// Everything except the use counter and a weak slot is fixed at construction.
pub struct CacheEntry {
    /// Derived call key
    key: String,
    /// Monotonic creation instant, used for expiry
    created_at: Instant,
    /// Creation timestamp (Unix milliseconds)
    created_at_ms: u64,
    /// Creation order within the owning cache, breaks priority ties
    sequence: u64,
    /// Zero = never expires
    ttl: Duration,
    /// How long the real computation took
    compute_cost: Duration,
    value: ValueSlot,
    uses: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry, created now.
    ///
    /// # Arguments
    /// * `key` - Derived call key
    /// * `value` - The computed result
    /// * `ttl` - Time-to-live, `Duration::ZERO` for no expiry
    /// * `compute_cost` - Duration of the computation that produced `value`
    /// * `weak` - Store the result in a clearable slot
    /// * `sequence` - Creation order within the owning cache
    pub fn new(
        key: String,
        value: CachedValue,
        ttl: Duration,
        compute_cost: Duration,
        weak: bool,
        sequence: u64,
    ) -> Self {
        let value = if weak {
            ValueSlot::Weak(RwLock::new(Some(value)))
        } else {
            ValueSlot::Hard(value)
        };

        Self {
            key,
            created_at: Instant::now(),
            created_at_ms: current_timestamp_ms(),
            sequence,
            ttl,
            compute_cost,
            value,
            uses: AtomicU64::new(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn compute_cost(&self) -> Duration {
        self.compute_cost
    }

    pub fn is_weak(&self) -> bool {
        matches!(self.value, ValueSlot::Weak(_))
    }

    // == Is Expired ==
    /// Checks whether the entry may no longer be served.
    ///
    /// True once more than `ttl` has elapsed since creation (never for a zero
    /// TTL), or when a weak-held value has been cleared.
    pub fn is_expired(&self) -> bool {
        let timed_out = !self.ttl.is_zero() && self.created_at.elapsed() > self.ttl;
        timed_out || self.is_reclaimed()
    }

    fn is_reclaimed(&self) -> bool {
        match &self.value {
            ValueSlot::Hard(_) => false,
            ValueSlot::Weak(slot) => slot.read().is_none(),
        }
    }

    // == Value ==
    /// Returns the cached result.
    ///
    /// # Errors
    /// `CacheError::StaleReference` when a weak value was cleared after the
    /// caller's expiry check. Callers treat this as a miss.
    pub fn value(&self) -> Result<CachedValue> {
        match &self.value {
            ValueSlot::Hard(value) => Ok(Arc::clone(value)),
            ValueSlot::Weak(slot) => slot
                .read()
                .as_ref()
                .map(Arc::clone)
                .ok_or_else(|| CacheError::StaleReference(self.key.clone())),
        }
    }

    /// Drops a weak-held value. Returns true if a value was cleared.
    pub fn reclaim(&self) -> bool {
        match &self.value {
            ValueSlot::Hard(_) => false,
            ValueSlot::Weak(slot) => slot.write().take().is_some(),
        }
    }

    // == Usage ==
    /// Records one more use of this entry.
    pub fn increment_uses(&self) {
        self.uses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uses(&self) -> u64 {
        self.uses.load(Ordering::Relaxed)
    }

    /// `uses * (compute_cost_nanos + 1)`, always at least `uses`.
    pub fn uses_by_timecost(&self) -> u128 {
        u128::from(self.uses()) * (self.compute_cost.as_nanos() + 1)
    }

    /// Frequency weight of this entry under `strategy`.
    ///
    /// Zero for the strategies that don't order by frequency.
    pub fn frequency_weight(&self, strategy: EvictionStrategy) -> u128 {
        match strategy {
            EvictionStrategy::Lfu => u128::from(self.uses()),
            EvictionStrategy::LfuTimecost => self.uses_by_timecost(),
            EvictionStrategy::Lru | EvictionStrategy::Fifo => 0,
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("created_at_ms", &self.created_at_ms)
            .field("ttl", &self.ttl)
            .field("compute_cost", &self.compute_cost)
            .field("weak", &self.is_weak())
            .field("uses", &self.uses())
            .field("expired", &self.is_expired())
            .finish()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
