//! Operation Lock Module
//!
//! Serializes concurrent identical calls: while one call with a given key is
//! running, others with the same key wait, up to a timeout.

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::cache::{CallArgs, KeyDeriver, OperationId, QualifiedKeyDeriver, StandardKeyDeriver};
use crate::error::{CacheError, Result};

/// Pause between two attempts to take a held lock.
pub const SPIN_INTERVAL: Duration = Duration::from_millis(5);

// == Op Lock ==
/// Per-key mutual exclusion with a bounded wait.
#[derive(Debug)]
pub struct OpLock {
    held: Mutex<HashSet<String>>,
    timeout: Duration,
    deriver: QualifiedKeyDeriver<StandardKeyDeriver>,
}

/// Releases a key when dropped, including on panic.
struct HeldKey<'a> {
    lock: &'a OpLock,
    key: String,
}

impl Drop for HeldKey<'_> {
    fn drop(&mut self) {
        self.lock.held.lock().remove(&self.key);
    }
}

impl OpLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            timeout,
            deriver: QualifiedKeyDeriver::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn try_acquire(&self, key: &str) -> bool {
        self.held.lock().insert(key.to_string())
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }

    // == With Lock ==
    /// Runs `f` while holding `key`.
    ///
    /// # Errors
    /// `CacheError::LockTimeout` if `key` is still held by another caller
    /// after the configured timeout; `f` is not run.
    pub fn with_lock<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        let started = Instant::now();
        while !self.try_acquire(key) {
            if started.elapsed() > self.timeout {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(key, timeout_ms, "Operation still locked after timeout");
                return Err(CacheError::LockTimeout {
                    key: key.to_string(),
                    timeout_ms,
                });
            }
            thread::sleep(SPIN_INTERVAL);
        }

        let _held = HeldKey {
            lock: self,
            key: key.to_string(),
        };
        Ok(f())
    }

    /// Runs `f` while holding the key of `operation(args)`.
    pub fn call<T, F>(&self, operation: &OperationId, args: &CallArgs, f: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        let key = self.deriver.derive(operation, args);
        self.with_lock(&key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_lock_released_after_call() {
        let lock = OpLock::new(Duration::from_millis(100));

        assert_eq!(lock.with_lock("k", || 1).unwrap(), 1);
        assert!(!lock.is_locked("k"));
        assert_eq!(lock.with_lock("k", || 2).unwrap(), 2);
    }

    #[test]
    fn test_timeout_when_key_held() {
        let lock = OpLock::new(Duration::from_millis(20));

        let result = lock.with_lock("k", || lock.with_lock("k", || ()));

        match result {
            Ok(Err(CacheError::LockTimeout { key, timeout_ms })) => {
                assert_eq!(key, "k");
                assert_eq!(timeout_ms, 20);
            }
            other => panic!("expected inner lock timeout, got {:?}", other),
        }
        assert!(!lock.is_locked("k"));
    }

    #[test]
    fn test_different_keys_do_not_block() {
        let lock = OpLock::new(Duration::from_millis(20));
        let result = lock.with_lock("a", || lock.with_lock("b", || 7));
        assert_eq!(result.unwrap().unwrap(), 7);
    }

    #[test]
    fn test_released_on_panic() {
        let lock = OpLock::new(Duration::from_millis(20));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            lock.with_lock("k", || panic!("computation failed")).ok();
        }));

        assert!(outcome.is_err());
        assert!(!lock.is_locked("k"));
    }

    #[test]
    fn test_serializes_identical_calls() {
        let lock = Arc::new(OpLock::new(Duration::from_secs(5)));
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let op = OperationId::new("Svc::slow");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let running = Arc::clone(&running);
                let max_seen = Arc::clone(&max_seen);
                let op = op.clone();
                thread::spawn(move || {
                    lock.call(&op, &CallArgs::new().arg(&1_u32), || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
