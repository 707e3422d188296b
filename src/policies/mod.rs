//! Retry policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how delays grow (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied to each delay
//! - [`RetryPolicy`]   attempt budget + retryability predicate driving an async block
//!
//! ## Wiring
//! ```text
//! job body ──► JobContext::retry(&policy, || network_call())
//!                 └─► RetryPolicy::run_cancellable(token, op)
//!                        └─► backoff.next(attempt) between attempts
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
