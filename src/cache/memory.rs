//! Memory Estimation Module
//!
//! Pluggable approximation of how much memory cached results occupy.

use std::any::Any;
use std::mem::{size_of, size_of_val};

use crate::cache::CacheEntry;

/// Estimates the byte size of one cached result.
///
/// Only called when statistics are requested with memory estimation.
/// Errors are logged by the caller and never fail the statistics call.
pub trait MemoryEstimator: Send + Sync {
    fn estimate(&self, key: &str, value: &(dyn Any + Send + Sync)) -> anyhow::Result<usize>;
}

// == Shallow Estimator ==
/// Counts the key, the entry record and the inline size of the value.
///
/// Heap data owned by the value (string buffers, vectors) is not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowEstimator;

impl MemoryEstimator for ShallowEstimator {
    fn estimate(&self, key: &str, value: &(dyn Any + Send + Sync)) -> anyhow::Result<usize> {
        Ok(key.len() + size_of::<CacheEntry>() + size_of_val(value))
    }
}
