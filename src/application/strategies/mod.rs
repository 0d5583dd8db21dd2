//! Rate limiting strategies.
//!
//! Each strategy binds a storage capability to an admission algorithm:
//!
//! - [`FixedWindowLimiter`]: one counter per clock-aligned window.
//! - [`MovingWindowLimiter`]: a timestamp log spanning the last window.
//! - [`SlidingWindowCounterLimiter`]: weighted previous/current buckets.
//!
//! All three implement the object-safe [`RateLimiter`] trait. When the
//! storage type is known at compile time, construct the strategy directly;
//! the type system then guarantees the required capability. When the
//! storage arrives as a tagged variant (e.g. from a URI), use
//! [`build_limiter`], which checks the advertised capabilities at
//! construction and rejects a storage that cannot support the strategy.

pub mod fixed_window;
pub mod moving_window;
pub mod sliding_window;

pub use fixed_window::FixedWindowLimiter;
pub use moving_window::MovingWindowLimiter;
pub use sliding_window::SlidingWindowCounterLimiter;

use crate::application::ports::{
    Capability, Clock, CounterStorage, MovingWindowStorage, SlidingWindowStorage,
};
use crate::application::stats::WindowStats;
use crate::domain::limit::RateLimit;
use crate::error::{LimiterError, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Common interface of all rate limiting strategies.
///
/// `hit` and `test` consume or probe one unit; the `_cost` variants weigh
/// a single call as `cost` units, acquired atomically (all or nothing).
pub trait RateLimiter: Send + Sync {
    /// Consume one unit of the limit.
    ///
    /// # Returns
    /// `Ok(true)` when admitted, `Ok(false)` when the algorithm decided
    /// against admission. Storage failures are errors, never `Ok(false)`.
    fn hit(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<bool> {
        self.hit_cost(limit, identifiers, 1)
    }

    /// Consume `cost` units of the limit atomically.
    fn hit_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool>;

    /// Check whether one unit could be consumed, without consuming it.
    ///
    /// Racy with concurrent `hit`s by design: the answer is a snapshot.
    fn test(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<bool> {
        self.test_cost(limit, identifiers, 1)
    }

    /// Check whether `cost` units could be consumed, without consuming.
    fn test_cost(&self, limit: &RateLimit, identifiers: &[&str], cost: u64) -> Result<bool>;

    /// Remaining units and reset time for the current window.
    fn get_window_stats(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<WindowStats>;

    /// Drop the stored state for this limit and identity.
    fn clear(&self, limit: &RateLimit, identifiers: &[&str]) -> Result<()>;
}

/// Strategy selector for the dynamic construction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Fixed window
    FixedWindow,
    /// Moving window
    MovingWindow,
    /// Sliding window counter
    SlidingWindowCounter,
}

impl StrategyKind {
    /// The storage capability this strategy requires.
    pub fn required_capability(&self) -> Capability {
        match self {
            StrategyKind::FixedWindow => Capability::Counter,
            StrategyKind::MovingWindow => Capability::MovingWindow,
            StrategyKind::SlidingWindowCounter => Capability::SlidingWindow,
        }
    }

    /// Stable name, usable in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::FixedWindow => "fixed-window",
            StrategyKind::MovingWindow => "moving-window",
            StrategyKind::SlidingWindowCounter => "sliding-window-counter",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed-window" => Ok(StrategyKind::FixedWindow),
            "moving-window" => Ok(StrategyKind::MovingWindow),
            "sliding-window-counter" => Ok(StrategyKind::SlidingWindowCounter),
            other => Err(LimiterError::Configuration(format!(
                "unknown strategy {other:?}"
            ))),
        }
    }
}

/// Construct a boxed strategy over a runtime-selected storage.
///
/// The storage's advertised [`Capabilities`](crate::Capabilities) are
/// checked here, at construction: a storage that cannot support the chosen
/// strategy is rejected with [`LimiterError::CapabilityMismatch`] before
/// any traffic reaches it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rate_limits::{build_limiter, parse, storage_from_uri, StrategyKind, SystemClock};
///
/// let storage = storage_from_uri("memory://").unwrap();
/// let limiter = build_limiter(
///     StrategyKind::MovingWindow,
///     storage,
///     Arc::new(SystemClock::new()),
/// )
/// .unwrap();
///
/// let limit = parse("10/minute").unwrap();
/// assert!(limiter.hit(&limit, &["client-1"]).unwrap());
/// ```
pub fn build_limiter<S>(
    kind: StrategyKind,
    storage: S,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn RateLimiter>>
where
    S: CounterStorage + MovingWindowStorage + SlidingWindowStorage + 'static,
{
    let required = kind.required_capability();

    if !storage.capabilities().supports(required) {
        return Err(LimiterError::CapabilityMismatch {
            backend: storage.name(),
            capability: required,
        });
    }

    Ok(match kind {
        StrategyKind::FixedWindow => Box::new(FixedWindowLimiter::with_clock(storage, clock)),
        StrategyKind::MovingWindow => Box::new(MovingWindowLimiter::with_clock(storage, clock)),
        StrategyKind::SlidingWindowCounter => {
            Box::new(SlidingWindowCounterLimiter::with_clock(storage, clock))
        }
    })
}

/// Clock-aligned start of the window containing `now`.
pub(crate) fn window_start(now: f64, window_seconds: u64) -> f64 {
    let window = window_seconds as f64;
    (now / window).floor() * window
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        Capabilities, MovingWindowSnapshot, SlidingWindowSnapshot, StorageBackend,
    };
    use crate::domain::granularity::Granularity;
    use crate::infrastructure::memory::MemoryStorage;
    use crate::infrastructure::mocks::MockClock;

    /// Storage that advertises only the counter capability. The moving and
    /// sliding operations exist to satisfy the trait bounds of
    /// `build_limiter`, but the advertised capabilities keep them
    /// unreachable.
    #[derive(Debug)]
    struct CounterOnlyStorage(MemoryStorage);

    impl CounterOnlyStorage {
        fn unsupported<T>(&self, capability: Capability) -> Result<T> {
            Err(LimiterError::CapabilityMismatch {
                backend: self.name(),
                capability,
            })
        }
    }

    impl StorageBackend for CounterOnlyStorage {
        fn name(&self) -> &'static str {
            "counter-only"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                counter: true,
                moving_window: false,
                sliding_window: false,
            }
        }

        fn check(&self) -> bool {
            self.0.check()
        }

        fn reset(&self) -> Result<()> {
            self.0.reset()
        }

        fn clear(&self, key: &str) -> Result<()> {
            self.0.clear(key)
        }
    }

    impl CounterStorage for CounterOnlyStorage {
        fn incr(
            &self,
            key: &str,
            expiry: u64,
            amount: u64,
            elastic_expiry: bool,
            now: f64,
        ) -> Result<u64> {
            self.0.incr(key, expiry, amount, elastic_expiry, now)
        }

        fn get(&self, key: &str, now: f64) -> Result<u64> {
            self.0.get(key, now)
        }

        fn get_expiry(&self, key: &str, now: f64) -> Result<f64> {
            self.0.get_expiry(key, now)
        }
    }

    impl MovingWindowStorage for CounterOnlyStorage {
        fn acquire_entry(&self, _: &str, _: u64, _: u64, _: u64, _: f64) -> Result<bool> {
            self.unsupported(Capability::MovingWindow)
        }

        fn get_moving_window(
            &self,
            _: &str,
            _: u64,
            _: u64,
            _: f64,
        ) -> Result<MovingWindowSnapshot> {
            self.unsupported(Capability::MovingWindow)
        }
    }

    impl SlidingWindowStorage for CounterOnlyStorage {
        fn acquire_sliding_window_entry(
            &self,
            _: &str,
            _: u64,
            _: u64,
            _: u64,
            _: f64,
        ) -> Result<bool> {
            self.unsupported(Capability::SlidingWindow)
        }

        fn get_sliding_window(&self, _: &str, _: u64, _: f64) -> Result<SlidingWindowSnapshot> {
            self.unsupported(Capability::SlidingWindow)
        }

        fn clear_sliding_window(&self, _: &str, _: u64, _: f64) -> Result<()> {
            self.unsupported(Capability::SlidingWindow)
        }
    }

    #[test]
    fn test_build_limiter_rejects_missing_capability() {
        for kind in [StrategyKind::MovingWindow, StrategyKind::SlidingWindowCounter] {
            let storage = CounterOnlyStorage(MemoryStorage::new());
            let clock = Arc::new(MockClock::new(0.0));

            match build_limiter(kind, storage, clock) {
                Err(LimiterError::CapabilityMismatch {
                    backend,
                    capability,
                }) => {
                    assert_eq!(backend, "counter-only");
                    assert_eq!(capability, kind.required_capability());
                }
                other => panic!("expected capability mismatch for {kind}, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn test_build_limiter_accepts_supported_capability() {
        let storage = CounterOnlyStorage(MemoryStorage::new());
        let clock = Arc::new(MockClock::new(0.0));
        let limiter = build_limiter(StrategyKind::FixedWindow, storage, clock).unwrap();
        let limit = crate::RateLimit::new(1, 1, Granularity::Minute).unwrap();

        assert!(limiter.hit(&limit, &["stub"]).unwrap());
        assert!(!limiter.hit(&limit, &["stub"]).unwrap());
    }

    #[test]
    fn test_window_start_alignment() {
        assert_eq!(window_start(0.0, 60), 0.0);
        assert_eq!(window_start(59.999, 60), 0.0);
        assert_eq!(window_start(60.0, 60), 60.0);
        assert_eq!(window_start(125.5, 60), 120.0);
    }
}
