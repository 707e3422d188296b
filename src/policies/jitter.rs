//! # Jitter applied to backoff delays.
//!
//! [`JitterPolicy`] spreads retries of concurrent tasks so they do not hit the
//! remote service in lockstep.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Proportional`] delay × random[0.5, 1.5)
//! - [`JitterPolicy::Equal`] delay/2 + random[0, delay/2]
//! - [`JitterPolicy::Full`] random[0, delay]

use rand::Rng;
use std::time::Duration;

/// Randomization strategy for retry delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the computed delay as is.
    #[default]
    None,
    /// Multiply by a uniform factor in `[0.5, 1.5)`. Mean delay is unchanged.
    Proportional,
    /// Keep half of the delay, randomize the other half.
    Equal,
    /// Uniform in `[0, delay]`.
    Full,
}

impl JitterPolicy {
    /// Selects [`JitterPolicy::Proportional`] when `enabled`, otherwise [`JitterPolicy::None`].
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            JitterPolicy::Proportional
        } else {
            JitterPolicy::None
        }
    }

    /// Applies jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        if delay.is_zero() {
            return delay;
        }
        let mut rng = rand::rng();
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Proportional => {
                let secs = delay.as_secs_f64() * rng.random_range(0.5..1.5);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
            JitterPolicy::Equal => {
                let ms = millis(delay);
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rng.random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
            JitterPolicy::Full => {
                let ms = millis(delay);
                Duration::from_millis(rng.random_range(0..=ms))
            }
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
