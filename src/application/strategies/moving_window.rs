//! Moving window rate limiting.
//!
//! A log of hit timestamps spanning exactly the last window length. The
//! most precise of the strategies: admission never over-shoots around a
//! boundary, because the window moves with the clock instead of being
//! pinned to it. Costs up to `amount` stored timestamps per key.

use crate::application::ports::{Clock, MovingWindowStorage};
use crate::application::stats::WindowStats;
use crate::application::strategies::RateLimiter;
use crate::domain::limit::RateLimit;
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;

/// Moving window strategy over an entry-log-capable storage.
///
/// # Examples
///
/// ```
/// use rate_limits::{parse, MemoryStorage, MovingWindowLimiter, RateLimiter};
///
/// let limiter = MovingWindowLimiter::new(MemoryStorage::new());
/// let limit = parse("1/minute").unwrap();
///
/// assert!(limiter.hit(&limit, &["client-1"]).unwrap());
/// assert!(!limiter.hit(&limit, &["client-1"]).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct MovingWindowLimiter<S> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: MovingWindowStorage> MovingWindowLimiter<S> {
    /// Create a limiter reading the system clock.
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock::new()))
    }

    /// Create a limiter with an explicit clock (e.g. a mock in tests).
    pub fn with_clock(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }
}

impl<S: MovingWindowStorage> RateLimiter for MovingWindowLimiter<S> {
    fn hit_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);

        self.storage
            .acquire_entry(&key, limit.amount(), limit.window_seconds(), cost, now)
    }

    fn test_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);
        let window = self
            .storage
            .get_moving_window(&key, limit.amount(), limit.window_seconds(), now)?;

        Ok(window.count + cost <= limit.amount())
    }

    fn get_window_stats(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<WindowStats> {
        let now = self.clock.now();
        let key = limit.key_for(identifiers);
        let window = self
            .storage
            .get_moving_window(&key, limit.amount(), limit.window_seconds(), now)?;

        let remaining = limit.amount().saturating_sub(window.count);
        let reset_time = if window.count > 0 {
            // The oldest live entry leaving the window frees the next slot.
            window.oldest + limit.window_seconds() as f64
        } else {
            now
        };

        Ok(WindowStats::new(remaining, reset_time))
    }

    fn clear(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<()> {
        self.storage.clear(&limit.key_for(identifiers))
    }
}
