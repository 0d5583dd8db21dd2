//! # rate-limits
//!
//! Rate limiting strategies over pluggable storage backends.
//!
//! This crate provides the algorithmic core of a rate limiter: given a limit
//! such as `10/minute` and an identity (an API key, a client address, ...),
//! it decides whether a request may proceed while keeping usage counters
//! accurate under concurrent access, in-process or across processes sharing
//! a storage backend.
//!
//! Three strategies are provided:
//!
//! - **Fixed window**: a single counter per clock-aligned window. Cheap, but
//!   allows up to `2 × amount` hits around a window boundary.
//! - **Moving window**: a log of hit timestamps covering exactly the last
//!   window length. Precise, at the cost of storing up to `amount` entries.
//! - **Sliding window counter**: the weighted sum of the previous and
//!   current fixed windows. A good compromise between the two.
//!
//! ## Quick start
//!
//! ```rust
//! use rate_limits::{parse, FixedWindowLimiter, MemoryStorage, RateLimiter};
//!
//! let limit = parse("10/minute").unwrap();
//! let limiter = FixedWindowLimiter::new(MemoryStorage::new());
//!
//! assert!(limiter.hit(&limit, &["client-1"]).unwrap());
//!
//! let stats = limiter.get_window_stats(&limit, &["client-1"]).unwrap();
//! assert_eq!(stats.remaining, 9);
//! ```
//!
//! ## Storage backends
//!
//! The in-memory backend is always available. The Redis backend is enabled
//! with the `redis` cargo feature; every multi-step Redis operation runs as
//! a single server-side Lua script, so the admission decision is atomic
//! across processes. Backends are also constructible from a URI:
//!
//! ```rust
//! use rate_limits::storage_from_uri;
//!
//! let storage = storage_from_uri("memory://").unwrap();
//! ```
//!
//! ## Failure semantics
//!
//! [`RateLimiter::hit`] returns `Ok(false)` only when admission was decided
//! against by the algorithm. Storage failures are returned as errors, never
//! converted to a denial, so callers can tell "rate limited" apart from
//! "storage unreachable" and fail closed on their own terms.

// Domain layer - pure business logic
pub mod domain;

// Application layer - strategies and the ports they require
pub mod application;

// Infrastructure layer - storage and clock adapters
pub mod infrastructure;

pub mod error;

// Re-export commonly used types for convenience
pub use domain::{
    granularity::Granularity,
    limit::RateLimit,
    parse::{parse, parse_many},
};

pub use application::{
    ports::{
        Capabilities, Capability, Clock, CounterStorage, MovingWindowSnapshot,
        MovingWindowStorage, SlidingWindowSnapshot, SlidingWindowStorage, StorageBackend,
    },
    stats::WindowStats,
    strategies::{
        build_limiter, FixedWindowLimiter, MovingWindowLimiter, RateLimiter,
        SlidingWindowCounterLimiter, StrategyKind,
    },
};

pub use error::{LimiterError, Result};

pub use infrastructure::{
    clock::SystemClock,
    factory::{storage_from_uri, AnyStorage},
    memory::MemoryStorage,
};

#[cfg(feature = "redis")]
pub use infrastructure::redis::RedisStorage;
