//! # Exponential backoff.
//!
//! [`BackoffPolicy`] maps an attempt index to a delay:
//!
//! ```text
//! delay(i) = jitter( min(first × factor^i, max) )
//! ```
//!
//! The base is recomputed from `first` and the attempt index every time, so a
//! jittered delay never feeds into the next one.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use gentask::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule between retry attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Cap applied before jitter.
    pub max: Duration,
    /// Multiplicative growth per attempt (`>= 1.0` expected).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 1s`, `max = 30s`, `factor = 2.0`, proportional jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Proportional,
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered delay for attempt `attempt` (0-indexed).
    ///
    /// Overflowing or non-finite products clamp to [`BackoffPolicy::max`].
    pub fn base(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs < 0.0 {
            return self.max;
        }
        Duration::try_from_secs_f64(secs).map_or(self.max, |d| d.min(self.max))
    }

    /// Delay to wait after failed attempt `attempt` (0-indexed), jitter included.
    pub fn next(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.base(attempt))
    }
}
