//! # Retry with exponential backoff.
//!
//! [`RetryPolicy`] re-runs an async operation while it fails with a retryable
//! error and the attempt budget allows it.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► attempt the block
//!   │     ├─ Ok                                 ─► return Ok
//!   │     └─ Err(e)
//!   │          ├─ predicate rejects e           ─► return Err(e)
//!   │          ├─ attempts == max_retries       ─► return Err(e)
//!   │          └─ sleep(backoff.next(attempt-1)) (cancellable) ─► continue
//! }
//! ```
//!
//! The error is returned unchanged; no wrapping.
//!
//! ## Presets
//! - [`RetryPolicy::network`]: `first=1s`, `max=10s`, `factor=1.5`, jitter,
//!   retries timeouts and connection failures only.
//! - [`RetryPolicy::file_io`]: `first=500ms`, `max=5s`, `factor=2.0`, no jitter,
//!   retries not-found, I/O and permission failures only.
//!
//! # Example
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use gentask::{RetryPolicy, TaskError};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() {
//! let calls = &AtomicU32::new(0);
//! let policy = RetryPolicy::network();
//!
//! let url = policy
//!     .run(move || async move {
//!         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
//!             Err(TaskError::timeout("gateway"))
//!         } else {
//!             Ok("https://cdn/img.png")
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(url, Ok("https://cdn/img.png"));
//! assert_eq!(calls.load(Ordering::SeqCst), 3);
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::network::Envelope;
use crate::policies::{BackoffPolicy, JitterPolicy};

type RetryPredicate = Arc<dyn Fn(&TaskError) -> bool + Send + Sync>;

/// Attempt budget, delay schedule and retryability predicate.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (`0` is treated as `1`).
    pub max_retries: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
    retry_on: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    /// Three attempts, [`BackoffPolicy::default`], retries [`TaskError::is_retryable`] errors.
    fn default() -> Self {
        Self::new(3, BackoffPolicy::default())
    }
}

impl RetryPolicy {
    /// Policy retrying every [`TaskError::is_retryable`] error.
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
            retry_on: Arc::new(TaskError::is_retryable),
        }
    }

    /// Network calls: slower start, gentler growth, jittered.
    pub fn network() -> Self {
        Self::new(
            3,
            BackoffPolicy {
                first: Duration::from_secs(1),
                max: Duration::from_secs(10),
                factor: 1.5,
                jitter: JitterPolicy::Proportional,
            },
        )
        .with_predicate(TaskError::is_network_transient)
    }

    /// Local file access: deterministic delays.
    pub fn file_io() -> Self {
        Self::new(
            3,
            BackoffPolicy {
                first: Duration::from_millis(500),
                max: Duration::from_secs(5),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        )
        .with_predicate(TaskError::is_file_transient)
    }

    /// Replaces the retryability predicate.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&TaskError) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Arc::new(predicate);
        self
    }

    /// Replaces the attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replaces the jitter flag (`true` = proportional jitter).
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.backoff.jitter = JitterPolicy::from_flag(enabled);
        self
    }

    /// Whether `err` would be retried by this policy.
    pub fn should_retry(&self, err: &TaskError) -> bool {
        !err.is_canceled() && (self.retry_on)(err)
    }

    #[inline]
    fn budget(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        self.run_inner(None, op).await
    }

    /// Like [`run`](Self::run), but a cancelled `token` aborts the backoff sleep
    /// (and prevents further attempts) with [`TaskError::Canceled`].
    pub async fn run_cancellable<T, F, Fut>(
        &self,
        token: &CancellationToken,
        op: F,
    ) -> Result<T, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        self.run_inner(Some(token), op).await
    }

    async fn run_inner<T, F, Fut>(
        &self,
        token: Option<&CancellationToken>,
        mut op: F,
    ) -> Result<T, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let budget = self.budget();
        let mut attempt: u32 = 0;

        loop {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return Err(TaskError::Canceled);
            }
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if !self.should_retry(&err) {
                tracing::debug!(attempt, error = %err, "error is not retryable");
                return Err(err);
            }
            if attempt >= budget {
                tracing::debug!(attempt, error = %err, "retry budget exhausted");
                return Err(err);
            }

            let delay = self.backoff.next(attempt - 1);
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retry scheduled"
            );
            pause(token, delay).await?;
        }
    }

    /// Envelope variant for calls that report failure in-band.
    ///
    /// Retries while the envelope is unsuccessful; once the budget is spent the
    /// last envelope is returned as `Ok`. Errors raised by `op` follow the same
    /// rules as [`run`](Self::run).
    pub async fn run_envelope<T, F, Fut>(&self, op: F) -> Result<Envelope<T>, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, TaskError>>,
    {
        self.run_envelope_inner(None, op).await
    }

    /// Cancellable form of [`run_envelope`](Self::run_envelope).
    pub async fn run_envelope_cancellable<T, F, Fut>(
        &self,
        token: &CancellationToken,
        op: F,
    ) -> Result<Envelope<T>, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, TaskError>>,
    {
        self.run_envelope_inner(Some(token), op).await
    }

    async fn run_envelope_inner<T, F, Fut>(
        &self,
        token: Option<&CancellationToken>,
        mut op: F,
    ) -> Result<Envelope<T>, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Envelope<T>, TaskError>>,
    {
        let budget = self.budget();
        let mut attempt: u32 = 0;

        loop {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return Err(TaskError::Canceled);
            }
            let outcome = op().await;
            attempt += 1;

            match outcome {
                Ok(envelope) if envelope.is_success() => return Ok(envelope),
                Ok(envelope) => {
                    if attempt >= budget {
                        tracing::debug!(attempt, code = envelope.code, "retry budget exhausted");
                        return Ok(envelope);
                    }
                    tracing::debug!(attempt, code = envelope.code, "unsuccessful envelope");
                }
                Err(err) => {
                    if !self.should_retry(&err) || attempt >= budget {
                        return Err(err);
                    }
                    tracing::debug!(attempt, error = %err, "envelope call failed");
                }
            }

            pause(token, self.backoff.next(attempt - 1)).await?;
        }
    }
}

/// Sleeps for `delay`, returning early with `Canceled` if `token` fires.
async fn pause(token: Option<&CancellationToken>, delay: Duration) -> Result<(), TaskError> {
    let Some(token) = token else {
        time::sleep(delay).await;
        return Ok(());
    };
    select! {
        _ = time::sleep(delay) => Ok(()),
        _ = token.cancelled() => Err(TaskError::Canceled),
    }
}
