//! Error types for rate limiting operations.

use crate::application::ports::Capability;
use thiserror::Error;

/// Main error type for rate limiting operations.
///
/// A [`RateLimiter`](crate::RateLimiter) never reports a storage failure as
/// a denied hit: `Ok(false)` means the algorithm decided against admission,
/// everything else surfaces here.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// The textual limit expression did not match the
    /// `amount / [multiples] granularity` grammar.
    #[error("malformed rate limit expression: {0:?}")]
    MalformedExpression(String),

    /// The storage backend failed or timed out. Also raised when a backend
    /// emulating atomicity through compare-and-swap exhausts its retry
    /// budget.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Redis I/O or protocol errors.
    #[cfg(feature = "redis")]
    #[error("storage unavailable: {0}")]
    Redis(#[from] redis::RedisError),

    /// The configured storage does not provide the operations the chosen
    /// strategy requires.
    #[error("{backend} storage does not support the {capability} capability")]
    CapabilityMismatch {
        /// Name of the storage backend.
        backend: &'static str,
        /// The capability the strategy requires.
        capability: Capability,
    },

    /// A storage URI or connection parameter could not be used.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for rate limiting operations.
pub type Result<T> = std::result::Result<T, LimiterError>;
