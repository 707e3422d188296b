//! Task execution.
//!
//! This module contains the per-type execution engine. The public surface is:
//! - [`TaskExecutor`] runs tasks, drives status transitions, handles cancellation
//! - [`Job`] / [`JobFn`] the type-specific body an executor runs
//! - [`JobContext`] handle given to a job (progress, checkpoints, retry)
//! - [`ExecutorCallback`] synchronous progress/outcome hook
//! - [`ExecutionOutcome`] how an execution ended
//!
//! Internal modules:
//! - [`context`]: per-execution state shared between engine and job;
//! - [`engine`]: lifecycle, in-flight table, cancellation, removal.

mod callback;
mod context;
mod engine;
mod job;

pub use callback::ExecutorCallback;
pub use context::JobContext;
pub use engine::{ExecutionOutcome, TaskExecutor};
pub use job::{Job, JobFn};
