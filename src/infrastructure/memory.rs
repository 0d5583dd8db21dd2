//! In-memory storage backend.
//!
//! Concurrent maps hold one table per value shape: integer counters for the
//! fixed window strategy, timestamp logs for the moving window strategy,
//! and bucket pairs for the sliding window counter. DashMap's per-entry
//! locking makes every multi-step read-modify-write on a single key atomic:
//! the whole operation runs under that key's entry guard, and no guard is
//! held across user code or other keys.
//!
//! Expiry is lazy: stale state is discarded when the key is next touched.
//! [`MemoryStorage::prune`] sweeps everything eagerly for callers that want
//! bounded memory between accesses.

use crate::application::ports::{
    Capabilities, CounterStorage, MovingWindowSnapshot, MovingWindowStorage,
    SlidingWindowSnapshot, SlidingWindowStorage, StorageBackend,
};
use crate::error::Result;
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::VecDeque;

/// Counter bucket with an absolute expiry.
#[derive(Debug, Clone, Copy)]
struct Counter {
    value: u64,
    expires_at: f64,
}

/// Moving window log. The window length is recorded so [`prune`] can tell
/// when the whole log has gone stale.
///
/// [`prune`]: MemoryStorage::prune
#[derive(Debug, Clone)]
struct EntryLog {
    window: f64,
    timestamps: VecDeque<f64>,
}

/// The two adjacent buckets of a sliding window counter.
#[derive(Debug, Clone, Copy)]
struct SlidingBuckets {
    previous_count: u64,
    current_count: u64,
    current_start: f64,
    window: f64,
}

impl SlidingBuckets {
    fn new(now: f64, window: f64) -> Self {
        Self {
            previous_count: 0,
            current_count: 0,
            current_start: (now / window).floor() * window,
            window,
        }
    }

    /// Advance the bucket pair to the window containing `now`.
    fn roll(&mut self, now: f64) {
        let start = (now / self.window).floor() * self.window;

        if start == self.current_start {
            return;
        }

        if start == self.current_start + self.window {
            self.previous_count = self.current_count;
        } else {
            // More than one window elapsed, both buckets are stale.
            self.previous_count = 0;
        }

        self.current_count = 0;
        self.current_start = start;
    }

    /// Seconds until the previous bucket stops weighing on the window.
    fn previous_ttl(&self, now: f64) -> f64 {
        if self.previous_count == 0 {
            return 0.0;
        }

        (self.current_start + self.window - now).max(0.0)
    }

    /// Seconds until the current bucket expires.
    fn current_ttl(&self, now: f64) -> f64 {
        (self.current_start + 2.0 * self.window - now).max(0.0)
    }

    fn snapshot(&self, now: f64) -> SlidingWindowSnapshot {
        SlidingWindowSnapshot {
            previous_count: self.previous_count,
            previous_ttl: self.previous_ttl(now),
            current_count: self.current_count,
            current_ttl: self.current_ttl(now),
        }
    }
}

/// Thread-safe in-process storage supporting all three strategies.
///
/// Shared use across strategies or threads goes through `Arc`:
///
/// ```
/// use std::sync::Arc;
/// use rate_limits::{FixedWindowLimiter, MemoryStorage, MovingWindowLimiter};
///
/// let storage = Arc::new(MemoryStorage::new());
/// let fixed = FixedWindowLimiter::new(storage.clone());
/// let moving = MovingWindowLimiter::new(storage);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    counters: DashMap<String, Counter, RandomState>,
    events: DashMap<String, EntryLog, RandomState>,
    sliding: DashMap<String, SlidingBuckets, RandomState>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired counter, log, and bucket pair.
    ///
    /// Expiry is otherwise lazy, so a key that stops receiving traffic
    /// holds its last state until this sweep runs.
    pub fn prune(&self, now: f64) {
        let before = self.counters.len() + self.events.len() + self.sliding.len();

        self.counters.retain(|_, counter| counter.expires_at > now);
        self.events.retain(|_, log| {
            log.timestamps
                .back()
                .is_some_and(|&newest| newest > now - log.window)
        });
        self.sliding
            .retain(|_, buckets| buckets.current_ttl(now) > 0.0);

        let after = self.counters.len() + self.events.len() + self.sliding.len();
        tracing::debug!(removed = before - after, "pruned expired rate limit state");
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn check(&self) -> bool {
        true
    }

    fn reset(&self) -> Result<()> {
        self.counters.clear();
        self.events.clear();
        self.sliding.clear();
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.counters.remove(key);
        self.events.remove(key);
        self.sliding.remove(key);
        Ok(())
    }
}

impl CounterStorage for MemoryStorage {
    fn incr(
        &self,
        key: &str,
        expiry: u64,
        amount: u64,
        elastic_expiry: bool,
        now: f64,
    ) -> Result<u64> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(Counter {
            value: 0,
            expires_at: now + expiry as f64,
        });

        if entry.expires_at <= now {
            // Stale bucket left over from an earlier window.
            entry.value = 0;
            entry.expires_at = now + expiry as f64;
        }

        entry.value += amount;

        if elastic_expiry {
            entry.expires_at = now + expiry as f64;
        }

        Ok(entry.value)
    }

    fn get(&self, key: &str, now: f64) -> Result<u64> {
        Ok(self
            .counters
            .get(key)
            .filter(|counter| counter.expires_at > now)
            .map_or(0, |counter| counter.value))
    }

    fn get_expiry(&self, key: &str, now: f64) -> Result<f64> {
        Ok(self
            .counters
            .get(key)
            .filter(|counter| counter.expires_at > now)
            .map_or(now, |counter| counter.expires_at))
    }
}

impl MovingWindowStorage for MemoryStorage {
    fn acquire_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        let mut entry = self.events.entry(key.to_string()).or_insert_with(|| EntryLog {
            window: expiry as f64,
            timestamps: VecDeque::new(),
        });

        let threshold = now - expiry as f64;
        while entry.timestamps.front().is_some_and(|&ts| ts <= threshold) {
            entry.timestamps.pop_front();
        }

        if entry.timestamps.len() as u64 + amount > limit {
            return Ok(false);
        }

        for _ in 0..amount {
            entry.timestamps.push_back(now);
        }

        Ok(true)
    }

    fn get_moving_window(
        &self,
        key: &str,
        _limit: u64,
        expiry: u64,
        now: f64,
    ) -> Result<MovingWindowSnapshot> {
        let Some(mut entry) = self.events.get_mut(key) else {
            return Ok(MovingWindowSnapshot {
                oldest: now,
                count: 0,
            });
        };

        let threshold = now - expiry as f64;
        while entry.timestamps.front().is_some_and(|&ts| ts <= threshold) {
            entry.timestamps.pop_front();
        }

        Ok(MovingWindowSnapshot {
            oldest: entry.timestamps.front().copied().unwrap_or(now),
            count: entry.timestamps.len() as u64,
        })
    }
}

impl SlidingWindowStorage for MemoryStorage {
    fn acquire_sliding_window_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        let window = expiry as f64;
        let mut entry = self
            .sliding
            .entry(key.to_string())
            .or_insert_with(|| SlidingBuckets::new(now, window));

        entry.roll(now);

        let weighted = entry.previous_count as f64 * entry.previous_ttl(now) / window
            + entry.current_count as f64;

        if weighted + amount as f64 > limit as f64 {
            return Ok(false);
        }

        entry.current_count += amount;
        Ok(true)
    }

    fn get_sliding_window(
        &self,
        key: &str,
        _expiry: u64,
        now: f64,
    ) -> Result<SlidingWindowSnapshot> {
        let Some(mut entry) = self.sliding.get_mut(key) else {
            return Ok(SlidingWindowSnapshot::default());
        };

        entry.roll(now);

        Ok(entry.snapshot(now))
    }

    fn clear_sliding_window(&self, key: &str, _expiry: u64, _now: f64) -> Result<()> {
        self.sliding.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incr_creates_with_expiry() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.incr("k", 60, 1, false, 100.0).unwrap(), 1);
        assert_eq!(storage.incr("k", 60, 1, false, 100.5).unwrap(), 2);
        assert_eq!(storage.get("k", 101.0).unwrap(), 2);
        assert_eq!(storage.get_expiry("k", 101.0).unwrap(), 160.0);
    }

    #[test]
    fn test_incr_preserves_expiry_by_default() {
        let storage = MemoryStorage::new();

        storage.incr("k", 10, 1, false, 100.0).unwrap();
        storage.incr("k", 10, 1, false, 105.0).unwrap();

        // Still the original deadline.
        assert_eq!(storage.get_expiry("k", 106.0).unwrap(), 110.0);
    }

    #[test]
    fn test_incr_elastic_expiry_extends() {
        let storage = MemoryStorage::new();

        storage.incr("k", 10, 1, true, 100.0).unwrap();
        storage.incr("k", 10, 1, true, 105.0).unwrap();

        assert_eq!(storage.get_expiry("k", 106.0).unwrap(), 115.0);
    }

    #[test]
    fn test_expired_counter_restarts() {
        let storage = MemoryStorage::new();

        storage.incr("k", 10, 5, false, 100.0).unwrap();
        assert_eq!(storage.incr("k", 10, 1, false, 111.0).unwrap(), 1);
    }

    #[test]
    fn test_get_absent_key() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.get("missing", 50.0).unwrap(), 0);
        assert_eq!(storage.get_expiry("missing", 50.0).unwrap(), 50.0);
    }

    #[test]
    fn test_acquire_entry_prunes_and_bounds() {
        let storage = MemoryStorage::new();

        assert!(storage.acquire_entry("k", 2, 60, 1, 0.0).unwrap());
        assert!(storage.acquire_entry("k", 2, 60, 1, 1.0).unwrap());
        assert!(!storage.acquire_entry("k", 2, 60, 1, 2.0).unwrap());

        // First entry expires at t=60 exactly (half-open window).
        assert!(storage.acquire_entry("k", 2, 60, 1, 60.0).unwrap());
    }

    #[test]
    fn test_acquire_entry_all_or_nothing() {
        let storage = MemoryStorage::new();

        assert!(storage.acquire_entry("k", 3, 60, 2, 0.0).unwrap());
        assert!(!storage.acquire_entry("k", 3, 60, 2, 1.0).unwrap());

        let window = storage.get_moving_window("k", 3, 60, 1.0).unwrap();
        assert_eq!(window.count, 2);
        assert_eq!(window.oldest, 0.0);
    }

    #[test]
    fn test_sliding_buckets_shift_once_per_window() {
        let storage = MemoryStorage::new();

        for _ in 0..3 {
            assert!(storage
                .acquire_sliding_window_entry("k", 10, 60, 1, 10.0)
                .unwrap());
        }

        let snapshot = storage.get_sliding_window("k", 60, 70.0).unwrap();
        assert_eq!(snapshot.previous_count, 3);
        assert_eq!(snapshot.current_count, 0);
        assert_eq!(snapshot.previous_ttl, 50.0);

        // Two windows later everything is stale.
        let snapshot = storage.get_sliding_window("k", 60, 130.0).unwrap();
        assert_eq!(snapshot.previous_count, 0);
        assert_eq!(snapshot.current_count, 0);
    }

    #[test]
    fn test_clear_touches_all_tables() {
        let storage = MemoryStorage::new();

        storage.incr("k", 60, 1, false, 0.0).unwrap();
        storage.acquire_entry("k", 5, 60, 1, 0.0).unwrap();
        storage
            .acquire_sliding_window_entry("k", 5, 60, 1, 0.0)
            .unwrap();

        storage.clear("k").unwrap();

        assert_eq!(storage.get("k", 1.0).unwrap(), 0);
        assert_eq!(storage.get_moving_window("k", 5, 60, 1.0).unwrap().count, 0);
        assert_eq!(
            storage.get_sliding_window("k", 60, 1.0).unwrap().current_count,
            0
        );
    }

    #[test]
    fn test_prune_drops_stale_state() {
        let storage = MemoryStorage::new();

        storage.incr("counter", 10, 1, false, 0.0).unwrap();
        storage.acquire_entry("log", 5, 10, 1, 0.0).unwrap();
        storage
            .acquire_sliding_window_entry("buckets", 5, 10, 1, 0.0)
            .unwrap();

        storage.prune(5.0);
        assert_eq!(storage.counters.len(), 1);
        assert_eq!(storage.events.len(), 1);
        assert_eq!(storage.sliding.len(), 1);

        storage.prune(25.0);
        assert_eq!(storage.counters.len(), 0);
        assert_eq!(storage.events.len(), 0);
        assert_eq!(storage.sliding.len(), 0);
    }

    #[test]
    fn test_concurrent_incr_is_lossless() {
        use std::sync::Arc;
        use std::thread;

        let storage = Arc::new(MemoryStorage::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let storage = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    storage.incr("k", 3600, 1, false, 0.0).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.get("k", 0.0).unwrap(), 8000);
    }

    #[test]
    fn test_concurrent_acquire_respects_limit() {
        use std::sync::Arc;
        use std::thread;

        let storage = Arc::new(MemoryStorage::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let storage = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                let mut acquired = 0;
                for _ in 0..100 {
                    if storage.acquire_entry("k", 50, 3600, 1, 0.0).unwrap() {
                        acquired += 1;
                    }
                }
                acquired
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
    }
}
