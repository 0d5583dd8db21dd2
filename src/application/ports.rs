//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the
//! application layer needs. Infrastructure adapters implement these ports.
//!
//! Storage is split into a base trait plus one capability trait per group
//! of atomic operations. A backend implements the capabilities it can make
//! atomic; each strategy requires exactly one capability:
//!
//! | Capability | Strategy |
//! |---|---|
//! | [`CounterStorage`] | fixed window |
//! | [`MovingWindowStorage`] | moving window |
//! | [`SlidingWindowStorage`] | sliding window counter |
//!
//! ## Atomicity contract
//!
//! Within a single key, every mutating operation must be linearizable: two
//! concurrent callers at the limit's edge must never both succeed. Backends
//! with server-side scripting run the whole operation server-side; a
//! backend with only compare-and-swap must emulate the contract with a
//! bounded optimistic-retry loop and surface an exhausted budget as a
//! storage error, leaving no partial state.
//!
//! ## Time
//!
//! Every time-dependent operation receives `now`, the caller's single
//! wall-clock reading for the whole strategy call (seconds since the Unix
//! epoch, fractional). Backends whose server owns TTLs may ignore it.

use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Port for obtaining current wall-clock time.
///
/// Returns seconds since the Unix epoch as `f64` for sub-second
/// resolution. Infrastructure provides concrete implementations
/// (`SystemClock`, `MockClock`).
pub trait Clock: Send + Sync + fmt::Debug {
    /// Get the current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// A named group of atomic storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Counter increment with TTL (`incr`/`get`/`get_expiry`).
    Counter,
    /// Timestamped entry log (`acquire_entry`/`get_moving_window`).
    MovingWindow,
    /// Adjacent window pair (`acquire_sliding_window_entry`/`get_sliding_window`).
    SlidingWindow,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Counter => "counter",
            Capability::MovingWindow => "moving-window",
            Capability::SlidingWindow => "sliding-window",
        };
        f.write_str(name)
    }
}

/// The set of capabilities a storage backend advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Supports [`CounterStorage`].
    pub counter: bool,
    /// Supports [`MovingWindowStorage`].
    pub moving_window: bool,
    /// Supports [`SlidingWindowStorage`].
    pub sliding_window: bool,
}

impl Capabilities {
    /// All three capabilities.
    pub const fn all() -> Self {
        Self {
            counter: true,
            moving_window: true,
            sliding_window: true,
        }
    }

    /// Whether a specific capability is advertised.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Counter => self.counter,
            Capability::MovingWindow => self.moving_window,
            Capability::SlidingWindow => self.sliding_window,
        }
    }
}

/// Base port every storage backend implements.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Short backend name, used in error messages.
    fn name(&self) -> &'static str;

    /// The capabilities this backend advertises.
    fn capabilities(&self) -> Capabilities;

    /// Health probe. Returns `false` instead of an error when the backend
    /// is unreachable.
    fn check(&self) -> bool;

    /// Drop all limiter state held by this backend.
    fn reset(&self) -> Result<()>;

    /// Remove the state stored under a single key.
    fn clear(&self, key: &str) -> Result<()>;
}

/// Counter operations, required by the fixed window strategy (and used by
/// the sliding window counter's buckets on backends that share the table).
pub trait CounterStorage: StorageBackend {
    /// Atomically increment the counter at `key` by `amount`.
    ///
    /// If the key does not exist it is created with the given expiry and
    /// its value set to `amount`. If it exists, the original expiry is
    /// preserved unless `elastic_expiry` is set, in which case the expiry
    /// is reset. The increment and the conditional expiry-set are observed
    /// as a single operation by concurrent callers.
    ///
    /// # Returns
    /// The counter value after the increment.
    fn incr(
        &self,
        key: &str,
        expiry: u64,
        amount: u64,
        elastic_expiry: bool,
        now: f64,
    ) -> Result<u64>;

    /// Current counter value, `0` if the key is absent or expired.
    fn get(&self, key: &str, now: f64) -> Result<u64>;

    /// Absolute expiry time of `key`, or `now` when the key is absent.
    fn get_expiry(&self, key: &str, now: f64) -> Result<f64>;
}

/// Snapshot of a moving window log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingWindowSnapshot {
    /// Timestamp of the oldest retained entry, or `now` when the log is
    /// empty.
    pub oldest: f64,
    /// Number of live entries.
    pub count: u64,
}

/// Entry-log operations, required by the moving window strategy.
///
/// An entry with timestamp exactly `now - expiry` is expired: the window
/// is the half-open interval `(now - expiry, now]`.
pub trait MovingWindowStorage: StorageBackend {
    /// Atomically prune entries older than `now - expiry` and, if fewer
    /// than `limit - amount + 1` entries remain, append `amount` entries
    /// at `now`.
    ///
    /// # Returns
    /// Whether the entries were acquired. Two concurrent callers at the
    /// limit's edge must not both succeed.
    fn acquire_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool>;

    /// Read-only snapshot of the live entries.
    fn get_moving_window(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        now: f64,
    ) -> Result<MovingWindowSnapshot>;
}

/// Snapshot of the two adjacent buckets of a sliding window counter.
///
/// TTLs are in seconds. The previous bucket's TTL is the time left until
/// it no longer weighs on the window; dividing it by the window length
/// gives the weighting factor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlidingWindowSnapshot {
    /// Count of the previous fixed window.
    pub previous_count: u64,
    /// Seconds until the previous bucket expires.
    pub previous_ttl: f64,
    /// Count of the current fixed window.
    pub current_count: u64,
    /// Seconds until the current bucket expires.
    pub current_ttl: f64,
}

/// Two-bucket operations, required by the sliding window counter strategy.
///
/// Buckets are aligned to `floor(now / expiry) × expiry` and each bucket
/// lives for twice the window length, so it remains readable as the
/// "previous" bucket throughout the following window.
pub trait SlidingWindowStorage: StorageBackend {
    /// Atomically read both buckets, compute the weighted usage, and if
    /// `usage + amount` fits under `limit`, add `amount` to the current
    /// bucket.
    ///
    /// # Returns
    /// Whether the entries were acquired.
    fn acquire_sliding_window_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool>;

    /// Read-only snapshot of both buckets.
    fn get_sliding_window(&self, key: &str, expiry: u64, now: f64)
        -> Result<SlidingWindowSnapshot>;

    /// Remove both buckets for `key`.
    ///
    /// Bucket naming is backend-internal, which is why this lives here and
    /// not on [`StorageBackend::clear`].
    fn clear_sliding_window(&self, key: &str, expiry: u64, now: f64) -> Result<()>;
}

// Shared storages are used through Arc; forward the ports so strategies can
// hold either an owned backend or a shared one.

impl<S: StorageBackend + ?Sized> StorageBackend for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn check(&self) -> bool {
        (**self).check()
    }

    fn reset(&self) -> Result<()> {
        (**self).reset()
    }

    fn clear(&self, key: &str) -> Result<()> {
        (**self).clear(key)
    }
}

impl<S: CounterStorage + ?Sized> CounterStorage for Arc<S> {
    fn incr(
        &self,
        key: &str,
        expiry: u64,
        amount: u64,
        elastic_expiry: bool,
        now: f64,
    ) -> Result<u64> {
        (**self).incr(key, expiry, amount, elastic_expiry, now)
    }

    fn get(&self, key: &str, now: f64) -> Result<u64> {
        (**self).get(key, now)
    }

    fn get_expiry(&self, key: &str, now: f64) -> Result<f64> {
        (**self).get_expiry(key, now)
    }
}

impl<S: MovingWindowStorage + ?Sized> MovingWindowStorage for Arc<S> {
    fn acquire_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        (**self).acquire_entry(key, limit, expiry, amount, now)
    }

    fn get_moving_window(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        now: f64,
    ) -> Result<MovingWindowSnapshot> {
        (**self).get_moving_window(key, limit, expiry, now)
    }
}

impl<S: SlidingWindowStorage + ?Sized> SlidingWindowStorage for Arc<S> {
    fn acquire_sliding_window_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        (**self).acquire_sliding_window_entry(key, limit, expiry, amount, now)
    }

    fn get_sliding_window(
        &self,
        key: &str,
        expiry: u64,
        now: f64,
    ) -> Result<SlidingWindowSnapshot> {
        (**self).get_sliding_window(key, expiry, now)
    }

    fn clear_sliding_window(&self, key: &str, expiry: u64, now: f64) -> Result<()> {
        (**self).clear_sliding_window(key, expiry, now)
    }
}
