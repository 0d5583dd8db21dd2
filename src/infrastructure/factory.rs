//! URI-based storage construction.
//!
//! A storage backend is selected by the scheme of a URI: `memory://` for
//! the in-process backend, `redis://` (and friends) for Redis. The result
//! is an [`AnyStorage`], a tagged variant implementing every capability
//! trait by delegation, so callers that pick their backend at runtime can
//! hand it to any strategy and rely on the construction-time capability
//! check in [`build_limiter`](crate::build_limiter).
//!
//! Schemes of backends this crate ships no driver for (`memcached://`,
//! `mongodb://`, `etcd://`, `redis+cluster://`, `redis+sentinel://`) are
//! recognized and rejected with a configuration error naming the scheme.

use crate::application::ports::{
    Capabilities, CounterStorage, MovingWindowSnapshot, MovingWindowStorage,
    SlidingWindowSnapshot, SlidingWindowStorage, StorageBackend,
};
use crate::error::{LimiterError, Result};
use crate::infrastructure::memory::MemoryStorage;

#[cfg(feature = "redis")]
use crate::infrastructure::redis::RedisStorage;

/// A storage backend selected at runtime.
#[derive(Debug)]
pub enum AnyStorage {
    /// In-process storage.
    Memory(MemoryStorage),
    /// Redis storage.
    #[cfg(feature = "redis")]
    Redis(RedisStorage),
}

/// Construct a storage backend from a URI.
///
/// # Examples
///
/// ```
/// use rate_limits::storage_from_uri;
///
/// let storage = storage_from_uri("memory://").unwrap();
/// assert!(storage_from_uri("carrier-pigeon://coop:1").is_err());
/// ```
///
/// # Errors
/// Returns [`LimiterError::Configuration`] for unknown schemes, known
/// schemes without a shipped driver, and URIs missing a scheme. Connection
/// failures surface as storage errors.
pub fn storage_from_uri(uri: &str) -> Result<AnyStorage> {
    let scheme = uri
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| {
            LimiterError::Configuration(format!("storage URI {uri:?} has no scheme"))
        })?;

    match scheme {
        "memory" => {
            tracing::debug!(scheme, "constructing storage backend");
            Ok(AnyStorage::Memory(MemoryStorage::new()))
        }

        #[cfg(feature = "redis")]
        "redis" | "rediss" | "redis+unix" => {
            tracing::debug!(scheme, "constructing storage backend");
            Ok(AnyStorage::Redis(RedisStorage::connect(uri)?))
        }
        #[cfg(not(feature = "redis"))]
        "redis" | "rediss" | "redis+unix" => Err(LimiterError::Configuration(format!(
            "`{scheme}://` requires building with the `redis` feature"
        ))),

        "redis+cluster" | "redis+sentinel" | "memcached" | "mongodb" | "etcd" => {
            Err(LimiterError::Configuration(format!(
                "no driver shipped for `{scheme}://` storage"
            )))
        }

        other => Err(LimiterError::Configuration(format!(
            "unrecognized storage scheme `{other}`"
        ))),
    }
}

impl StorageBackend for AnyStorage {
    fn name(&self) -> &'static str {
        match self {
            AnyStorage::Memory(storage) => storage.name(),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.name(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            AnyStorage::Memory(storage) => storage.capabilities(),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.capabilities(),
        }
    }

    fn check(&self) -> bool {
        match self {
            AnyStorage::Memory(storage) => storage.check(),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.check(),
        }
    }

    fn reset(&self) -> Result<()> {
        match self {
            AnyStorage::Memory(storage) => storage.reset(),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.reset(),
        }
    }

    fn clear(&self, key: &str) -> Result<()> {
        match self {
            AnyStorage::Memory(storage) => storage.clear(key),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.clear(key),
        }
    }
}

impl CounterStorage for AnyStorage {
    fn incr(
        &self,
        key: &str,
        expiry: u64,
        amount: u64,
        elastic_expiry: bool,
        now: f64,
    ) -> Result<u64> {
        match self {
            AnyStorage::Memory(storage) => storage.incr(key, expiry, amount, elastic_expiry, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.incr(key, expiry, amount, elastic_expiry, now),
        }
    }

    fn get(&self, key: &str, now: f64) -> Result<u64> {
        match self {
            AnyStorage::Memory(storage) => storage.get(key, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.get(key, now),
        }
    }

    fn get_expiry(&self, key: &str, now: f64) -> Result<f64> {
        match self {
            AnyStorage::Memory(storage) => storage.get_expiry(key, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.get_expiry(key, now),
        }
    }
}

impl MovingWindowStorage for AnyStorage {
    fn acquire_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        match self {
            AnyStorage::Memory(storage) => storage.acquire_entry(key, limit, expiry, amount, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.acquire_entry(key, limit, expiry, amount, now),
        }
    }

    fn get_moving_window(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        now: f64,
    ) -> Result<MovingWindowSnapshot> {
        match self {
            AnyStorage::Memory(storage) => storage.get_moving_window(key, limit, expiry, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.get_moving_window(key, limit, expiry, now),
        }
    }
}

impl SlidingWindowStorage for AnyStorage {
    fn acquire_sliding_window_entry(
        &self,
        key: &str,
        limit: u64,
        expiry: u64,
        amount: u64,
        now: f64,
    ) -> Result<bool> {
        match self {
            AnyStorage::Memory(storage) => {
                storage.acquire_sliding_window_entry(key, limit, expiry, amount, now)
            }
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => {
                storage.acquire_sliding_window_entry(key, limit, expiry, amount, now)
            }
        }
    }

    fn get_sliding_window(
        &self,
        key: &str,
        expiry: u64,
        now: f64,
    ) -> Result<SlidingWindowSnapshot> {
        match self {
            AnyStorage::Memory(storage) => storage.get_sliding_window(key, expiry, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.get_sliding_window(key, expiry, now),
        }
    }

    fn clear_sliding_window(&self, key: &str, expiry: u64, now: f64) -> Result<()> {
        match self {
            AnyStorage::Memory(storage) => storage.clear_sliding_window(key, expiry, now),
            #[cfg(feature = "redis")]
            AnyStorage::Redis(storage) => storage.clear_sliding_window(key, expiry, now),
        }
    }
}
