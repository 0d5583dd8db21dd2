//! Window statistics for limit introspection.

/// A read-only snapshot of a limit's current window.
///
/// The snapshot is informational, not a reservation: a `remaining` of 3
/// does not guarantee that the next 3 hits will be admitted under
/// concurrent load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Hits still admissible in the current window.
    pub remaining: u64,
    /// Seconds since the Unix epoch at which the window resets (for the
    /// sliding window counter: at which usage drops below the limit,
    /// assuming no further hits).
    pub reset_time: f64,
}

impl WindowStats {
    /// Create a new snapshot.
    pub fn new(remaining: u64, reset_time: f64) -> Self {
        Self {
            remaining,
            reset_time,
        }
    }
}
