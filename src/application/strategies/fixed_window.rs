//! Fixed window rate limiting.
//!
//! One counter per clock-aligned window. The window-start epoch is baked
//! into the storage key, so keys are self-segregating: a new window means a
//! fresh key and the old counter simply ages out through its TTL. No
//! explicit reset is ever needed.

use crate::application::ports::{Clock, CounterStorage};
use crate::application::stats::WindowStats;
use crate::application::strategies::{window_start, RateLimiter};
use crate::domain::limit::RateLimit;
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;

/// Fixed window strategy over a counter-capable storage.
///
/// # Examples
///
/// ```
/// use rate_limits::{parse, FixedWindowLimiter, MemoryStorage, RateLimiter};
///
/// let limiter = FixedWindowLimiter::new(MemoryStorage::new());
/// let limit = parse("2/second").unwrap();
///
/// assert!(limiter.hit(&limit, &["client-1"]).unwrap());
/// assert!(limiter.hit(&limit, &["client-1"]).unwrap());
/// assert!(!limiter.hit(&limit, &["client-1"]).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter<S> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: CounterStorage> FixedWindowLimiter<S> {
    /// Create a limiter reading the system clock.
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock::new()))
    }

    /// Create a limiter with an explicit clock (e.g. a mock in tests).
    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Storage key for the window containing `now`.
    fn window_key(&self, limit: &RateLimit, identifiers: &[&str], now: f64) -> String {
        let start = window_start(now, limit.window_seconds());
        format!("{}/{}", limit.key_for(identifiers), start as u64)
    }
}

impl<S: CounterStorage> RateLimiter for FixedWindowLimiter<S> {
    fn hit_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = self.window_key(limit, identifiers, now);
        let value = self
            .storage
            .incr(&key, limit.window_seconds(), cost, false, now)?;

        // A denied hit has already been counted; that is deliberate. The
        // counter stays above the limit for the rest of the window, which
        // keeps subsequent hits denied without a decrement round-trip that
        // would reopen the race.
        Ok(value <= limit.amount())
    }

    fn test_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = self.window_key(limit, identifiers, now);
        let value = self.storage.get(&key, now)?;

        Ok(value + cost <= limit.amount())
    }

    fn get_window_stats(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<WindowStats> {
        let now = self.clock.now();
        let window = limit.window_seconds();
        let key = self.window_key(limit, identifiers, now);
        let value = self.storage.get(&key, now)?;

        let remaining = limit.amount().saturating_sub(value);
        let reset_time = window_start(now, window) + window as f64;

        Ok(WindowStats::new(remaining, reset_time))
    }

    fn clear(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<()> {
        let now = self.clock.now();
        let key = self.window_key(limit, identifiers, now);

        self.storage.clear(&key)
    }
}
