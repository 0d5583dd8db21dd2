//! Clock adapters for time operations.
//!
//! Provides `SystemClock` for production use.
//!
//! # Testing
//!
//! See [`MockClock`](crate::infrastructure::mocks::MockClock) for a
//! controllable test clock.

use crate::application::ports::Clock;
use std::time::{SystemTime, UNIX_EPOCH};

/// System clock reading wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
    }
}
