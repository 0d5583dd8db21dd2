//! Sliding window counter rate limiting.
//!
//! Two counters per key: one for the current clock-aligned window, one for
//! the previous. Usage is the current count plus the previous count scaled
//! by how much of the previous window still overlaps the sliding window:
//!
//! ```text
//! weight = (window - elapsed) / window
//! usage  = previous_count * weight + current_count
//! ```
//!
//! This approximates a moving window with O(1) storage: the previous
//! window's hits are assumed uniformly distributed, so the bound holds in
//! the weighted sense rather than exactly.

use crate::application::ports::{Clock, SlidingWindowSnapshot, SlidingWindowStorage};
use crate::application::stats::WindowStats;
use crate::application::strategies::{window_start, RateLimiter};
use crate::domain::limit::RateLimit;
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;

/// Sliding window counter strategy over a two-bucket-capable storage.
///
/// # Examples
///
/// ```
/// use rate_limits::{parse, MemoryStorage, RateLimiter, SlidingWindowCounterLimiter};
///
/// let limiter = SlidingWindowCounterLimiter::new(MemoryStorage::new());
/// let limit = parse("10/minute").unwrap();
///
/// assert!(limiter.hit(&limit, &["client-1"]).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct SlidingWindowCounterLimiter<S> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: SlidingWindowStorage> SlidingWindowCounterLimiter<S> {
    /// Create a limiter reading the system clock.
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock::new()))
    }

    /// Create a limiter with an explicit clock (e.g. a mock in tests).
    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Weighted usage of the two buckets.
    fn weighted_count(limit: &RateLimit, snapshot: &SlidingWindowSnapshot) -> f64 {
        let window = limit.window_seconds() as f64;

        snapshot.previous_count as f64 * snapshot.previous_ttl / window
            + snapshot.current_count as f64
    }
}

impl<S: SlidingWindowStorage> RateLimiter for SlidingWindowCounterLimiter<S> {
    fn hit_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);

        self.storage.acquire_sliding_window_entry(
            &key,
            limit.amount(),
            limit.window_seconds(),
            cost,
            now,
        )
    }

    fn test_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);
        let snapshot = self
            .storage
            .get_sliding_window(&key, limit.window_seconds(), now)?;
        let usage = Self::weighted_count(limit, &snapshot);

        Ok(usage + cost as f64 - 1.0 < limit.amount() as f64)
    }

    fn get_window_stats(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<WindowStats> {
        let now = self.clock.now();
        let window = limit.window_seconds() as f64;
        let amount = limit.amount() as f64;
        let key = limit.key_for(identifiers);
        let snapshot = self
            .storage
            .get_sliding_window(&key, limit.window_seconds(), now)?;

        let usage = Self::weighted_count(limit, &snapshot);
        let remaining = (amount - usage).floor().max(0.0) as u64;

        // The instant at which the decaying previous-window weight brings
        // usage back under the limit, assuming no further hits. With an
        // empty previous bucket nothing decays before the next boundary.
        let current_start = window_start(now, limit.window_seconds());
        let reset_time = if snapshot.previous_count == 0 {
            current_start + window
        } else {
            let drained = 1.0
                - (amount - snapshot.current_count as f64) / snapshot.previous_count as f64;
            (current_start + window * drained).clamp(now, current_start + window)
        };

        Ok(WindowStats::new(remaining, reset_time))
    }

    fn clear(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<()> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);

        self.storage
            .clear_sliding_window(&key, limit.window_seconds(), now)
    }
}
