//! The rate limit value object.
//!
//! A [`RateLimit`] is an immutable `(amount, multiples, granularity)` triple:
//! `amount` events are permitted per `multiples × granularity` of time.
//! Its canonical string form (`10 per 1 minute`) and its storage-key
//! derivation both embed all three fields, so limits of different shape can
//! never collide in storage.

use crate::domain::granularity::Granularity;
use crate::domain::parse;
use crate::error::{LimiterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace prefixed to every storage key derived from a limit.
const KEY_NAMESPACE: &str = "LIMITER";

/// An immutable rate limit: `amount` events per `multiples × granularity`.
///
/// # Examples
///
/// ```
/// use rate_limits::{Granularity, RateLimit};
///
/// let limit = RateLimit::new(5, 3, Granularity::Second).unwrap();
/// assert_eq!(limit.window_seconds(), 3);
/// assert_eq!(limit.to_string(), "5 per 3 second");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimit {
    amount: u64,
    multiples: u64,
    granularity: Granularity,
}

impl RateLimit {
    /// Create a new rate limit.
    ///
    /// # Arguments
    /// * `amount` - Number of events permitted per window, must be positive
    /// * `multiples` - Multiplier on the granularity, must be positive
    /// * `granularity` - The base time unit
    ///
    /// # Errors
    /// Returns [`LimiterError::MalformedExpression`] when `amount` or
    /// `multiples` is zero.
    pub fn new(amount: u64, multiples: u64, granularity: Granularity) -> Result<Self> {
        if amount == 0 || multiples == 0 {
            return Err(LimiterError::MalformedExpression(format!(
                "{amount} per {multiples} {granularity}"
            )));
        }

        Ok(Self {
            amount,
            multiples,
            granularity,
        })
    }

    /// Number of events permitted per window.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Multiplier on the granularity.
    pub fn multiples(&self) -> u64 {
        self.multiples
    }

    /// The base time unit.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Length of one window in seconds.
    pub fn window_seconds(&self) -> u64 {
        self.multiples * self.granularity.seconds()
    }

    /// Storage key for this limit and the given identity components.
    ///
    /// The key joins the namespace, the identity components, and the limit's
    /// fingerprint (`amount`, `multiples`, `granularity`) with `/`, so two
    /// limits differing in any fingerprint field occupy disjoint key spaces.
    pub fn key_for(&self, identifiers: &[&str]) -> String {
        let mut key = String::from(KEY_NAMESPACE);

        for identifier in identifiers {
            key.push('/');
            key.push_str(identifier);
        }

        key.push('/');
        key.push_str(&self.amount.to_string());
        key.push('/');
        key.push_str(&self.multiples.to_string());
        key.push('/');
        key.push_str(self.granularity.name());

        key
    }
}

impl fmt::Display for RateLimit {
    /// Canonical string form: `"{amount} per {multiples} {granularity}"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {} {}", self.amount, self.multiples, self.granularity)
    }
}

impl FromStr for RateLimit {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self> {
        parse::parse(s)
    }
}
