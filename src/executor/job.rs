//! # Job bodies.
//!
//! A [`Job`] is the type-specific work an executor runs for a task: call the
//! generation service, poll for the result, download it. It receives a
//! [`JobContext`] and returns the result payload (URL, path or structured
//! text) that ends up on the task record.
//!
//! Jobs must call [`JobContext::checkpoint`] (or a cancellable helper such as
//! [`JobContext::sleep`]) at every meaningful step so that cancellation is
//! observed promptly.
//!
//! [`JobFn`] wraps a closure, creating a fresh future per execution.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use gentask::{JobContext, JobFn, TaskError, TaskRecord, TaskType};
//!
//! let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |ctx: JobContext<TaskRecord>| async move {
//!     for step in 1..=4u8 {
//!         ctx.sleep(Duration::from_millis(250)).await?;
//!         ctx.set_progress(step * 25).await?;
//!     }
//!     Ok::<_, TaskError>(format!("https://cdn.example/{}.png", ctx.task_id()))
//! });
//! # let _ = job;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::executor::context::JobContext;
use crate::status::TaskType;

/// Type-specific body of a task execution.
#[async_trait]
pub trait Job<T>: Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    /// Task types this job knows how to run.
    fn supported_types(&self) -> &[TaskType];

    /// Runs the job to completion, failure or cancellation.
    ///
    /// Return `Err(TaskError::Canceled)` (or just `?` a failed checkpoint) when
    /// cancellation is observed; the executor then leaves the task untouched.
    async fn run(&self, ctx: JobContext<T>) -> Result<String, TaskError>;
}

/// Function-backed job.
pub struct JobFn<F> {
    types: Vec<TaskType>,
    f: F,
}

impl<F> JobFn<F> {
    pub fn new(types: Vec<TaskType>, f: F) -> Self {
        Self { types, f }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(types: Vec<TaskType>, f: F) -> Arc<Self> {
        Arc::new(Self::new(types, f))
    }
}

#[async_trait]
impl<T, F, Fut> Job<T> for JobFn<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(JobContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, TaskError>> + Send + 'static,
{
    fn supported_types(&self) -> &[TaskType] {
        &self.types
    }

    async fn run(&self, ctx: JobContext<T>) -> Result<String, TaskError> {
        (self.f)(ctx).await
    }
}
