//! # Executor configuration.
//!
//! [`ExecutorConfig`] centralizes the knobs a [`TaskExecutor`](crate::TaskExecutor)
//! reads at execution time.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout (see [`ExecutorConfig::job_timeout`])

use std::time::Duration;

/// Settings shared by every execution of one executor.
///
/// All fields are public; prefer the helper accessors over checking sentinels
/// by hand.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Upper bound for a single job body.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = the job's token is cancelled and the task is marked
    ///   `FAILURE` with a timeout reason
    pub timeout: Duration,

    /// Emit a `0%` progress callback right after the task enters `RUNNING`.
    pub progress_on_start: bool,
}

impl ExecutorConfig {
    /// Job timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn job_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }
}

impl Default for ExecutorConfig {
    /// - `timeout = 0s` (no timeout)
    /// - `progress_on_start = true`
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            progress_on_start: true,
        }
    }
}
