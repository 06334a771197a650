//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache invariants over random operation sequences.

use proptest::prelude::*;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    CacheContext, CacheSettings, CachedOperation, CallArgs, EvictionStrategy, MethodCache,
    OperationId,
};

// == Strategies ==
/// Generates cache keys from a small space so sequences revisit keys
fn key_strategy() -> impl Strategy<Value = String> {
    "~~[a-h]{1,2}".prop_map(|s| s)
}

fn eviction_strategy() -> impl Strategy<Value = EvictionStrategy> {
    prop_oneof![
        Just(EvictionStrategy::Lru),
        Just(EvictionStrategy::Fifo),
        Just(EvictionStrategy::Lfu),
        Just(EvictionStrategy::LfuTimecost),
    ]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, cost_nanos: u64 },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), 0u64..10_000).prop_map(|(key, cost_nanos)| CacheOp::Put { key, cost_nanos }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn method_cache(max_entries: usize, eviction: EvictionStrategy) -> MethodCache {
    let settings = CacheSettings::builder()
        .max_entries(max_entries)
        .eviction(eviction)
        .build()
        .unwrap();
    MethodCache::new(OperationId::new("Prop::op"), settings)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any strategy and operation sequence, hit/miss/load counters match
    // what the caller observed and the entry count matches the store.
    #[test]
    fn prop_statistics_accuracy(
        eviction in eviction_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let cache = method_cache(8, eviction);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_loads: u64 = 0;
        let mut expected_load_time: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, cost_nanos } => {
                    cache.put(key, Arc::new(()), Duration::from_nanos(cost_nanos));
                    expected_loads += 1;
                    expected_load_time += cost_nanos;
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                }
            }
        }

        let stats = cache.snapshot(None);
        prop_assert_eq!(stats.hit_count, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.miss_count, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.load_count, expected_loads, "Loads mismatch");
        prop_assert_eq!(stats.total_load_time_nanos, expected_load_time, "Load time mismatch");
        prop_assert_eq!(stats.entries, cache.len(), "Entry count mismatch");
    }

    // For any strategy, the cache never holds more than max_entries and
    // every put of a new key into a full cache counts exactly one eviction.
    #[test]
    fn prop_capacity_enforcement(
        eviction in eviction_strategy(),
        max_entries in 1usize..10,
        keys in prop::collection::vec(key_strategy(), 1..120)
    ) {
        let cache = method_cache(max_entries, eviction);
        let mut expected_evictions: u64 = 0;

        for key in keys {
            if !cache.contains(&key) && cache.len() >= max_entries {
                expected_evictions += 1;
            }
            cache.put(key, Arc::new(0u8), Duration::ZERO);
            prop_assert!(
                cache.len() <= max_entries,
                "Cache size {} exceeds max {}",
                cache.len(),
                max_entries
            );
        }

        prop_assert_eq!(cache.snapshot(None).eviction_count, expected_evictions);
    }

    // For any argument, repeated calls through an owner compute exactly once
    // and always return the first result.
    #[test]
    fn prop_idempotent_hit(arg in "[a-z0-9]{0,16}", repeats in 1usize..20) {
        let ctx = CacheContext::new();
        let owner = ctx.owner("Prop");
        let op = CachedOperation::new("Prop::len", CacheSettings::builder().build().unwrap());
        let calls = Cell::new(0u32);

        let first = owner.call(&op, &CallArgs::new().arg(&arg), || {
            calls.set(calls.get() + 1);
            format!("{}:{}", arg, calls.get())
        });
        for _ in 0..repeats {
            let again = owner.call(&op, &CallArgs::new().arg(&arg), || {
                calls.set(calls.get() + 1);
                format!("{}:{}", arg, calls.get())
            });
            prop_assert_eq!(&again, &first);
        }
        prop_assert_eq!(calls.get(), 1);
    }
}
