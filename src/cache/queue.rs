//! Eviction Queue Module
//!
//! Orders cache keys by eviction priority for every eviction strategy.

use std::collections::{BTreeMap, HashMap};

// == Priority ==
/// Eviction priority of one key. Lower priorities are evicted first.
///
/// `weight` is strategy-specific (access tick, use count, weighted use count,
/// or zero for FIFO); `sequence` is the entry's creation order and breaks ties
/// oldest-first. Sequences are unique per cache, so priorities never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority {
    pub weight: u128,
    pub sequence: u64,
}

impl Priority {
    pub fn new(weight: u128, sequence: u64) -> Self {
        Self { weight, sequence }
    }
}

// == Eviction Queue ==
/// Tracks keys in eviction order.
///
/// - First = next to evict
/// - Last = most protected
#[derive(Debug, Default)]
pub struct EvictionQueue {
    /// Keys by priority
    order: BTreeMap<Priority, String>,
    /// Current priority of each key
    positions: HashMap<String, Priority>,
}

impl EvictionQueue {
    // == Constructor ==
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Places a key at `priority`, replacing any earlier position.
    pub fn touch(&mut self, key: &str, priority: Priority) {
        self.remove(key);
        self.order.insert(priority, key.to_string());
        self.positions.insert(key.to_string(), priority);
    }

    // == Remove ==
    /// Removes a key from the queue. Returns true if it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.positions.remove(key) {
            Some(priority) => {
                self.order.remove(&priority);
                true
            }
            None => false,
        }
    }

    // == Evict First ==
    /// Returns and removes the key with the lowest priority.
    ///
    /// Returns None if the queue is empty.
    pub fn evict_first(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.positions.remove(&key);
        Some(key)
    }

    // == Peek First ==
    /// Returns the next key to evict without removing it.
    pub fn peek_first(&self) -> Option<&String> {
        self.order.values().next()
    }

    /// Current priority of a key.
    pub fn priority_of(&self, key: &str) -> Option<Priority> {
        self.positions.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }
}
