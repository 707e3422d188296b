//! # gentask
//!
//! **gentask** is the orchestration core for long-running, cancellable
//! content-generation tasks (text-to-image, video generation and editing, ...).
//!
//! It runs a task's job body, tracks the task through a status state machine,
//! persists every transition through a pluggable storage port, retries flaky
//! network and file operations with exponential backoff, and fans status
//! changes out to listeners without knowing the concrete task entity.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   TaskRecord / custom entity ──► TaskAdapter<T> ──► TaskStore (external)
//!                                        │
//!                                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskExecutor<T>  (one per job kind)                              │
//! │  - in-flight table (task id → cancellation token)                 │
//! │  - Job<T>         (type-specific body)                            │
//! │  - ExecutorCallback (progress / success / failure)                │
//! └──────┬──────────────────────────┬──────────────────────────┬──────┘
//!        ▼                          ▼                          ▼
//!   JobContext<T>             status transitions          TaskEvent
//!   - checkpoint / sleep      via TaskAdapter::mark_*     (type-erased)
//!   - set_progress            + update_task                    │
//!   - retry ──► RetryPolicy                                    ▼
//!               (backoff + jitter)                     ListenerRegistry
//!                                                     scoped ─► global
//! ```
//!
//! ### Lifecycle
//! ```text
//! CREATE ──► RUNNING ──► SUCCESS | FAILURE
//!   any ──► DELETE
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Status model**  | Closed lifecycle, open job kinds.                             | [`TaskStatus`], [`TaskType`]                |
//! | **Adapters**      | Generic access to any persisted task entity.                  | [`TaskAdapter`], [`RecordAdapter`]          |
//! | **Storage port**  | Key-indexed persistence contract + in-memory store.           | [`TaskStore`], [`MemoryStore`]              |
//! | **Events**        | Read-only, type-erased notification envelope.                 | [`TaskEvent`]                               |
//! | **Listeners**     | Scoped and global subscriptions, copy-on-write.               | [`TaskListener`], [`ListenerRegistry`]      |
//! | **Retry**         | Exponential backoff with jitter, predicates, envelope variant.| [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Execution**     | Job bodies, progress, cooperative cancellation.               | [`TaskExecutor`], [`Job`], [`JobContext`]   |
//! | **Errors**        | One classified error type.                                    | [`TaskError`]                               |
//!
//! ## Optional features
//! - `logging`: exports [`LogListener`], a tracing-backed listener _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gentask::{
//!     ExecutionOutcome, JobContext, JobFn, ListenerRegistry, MemoryStore, RecordAdapter,
//!     TaskError, TaskExecutor, TaskRecord, TaskStatus, TaskType,
//! };
//!
//! #[tokio::main(flavor = "current_thread", start_paused = true)]
//! async fn main() -> Result<(), TaskError> {
//!     let store = Arc::new(MemoryStore::<TaskRecord>::new());
//!     let adapter = Arc::new(RecordAdapter::new(store.clone()));
//!     let listeners = Arc::new(ListenerRegistry::new());
//!
//!     let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |ctx: JobContext<TaskRecord>| async move {
//!         ctx.sleep(Duration::from_secs(1)).await?;
//!         ctx.set_progress(50).await?;
//!         Ok::<_, TaskError>("https://cdn.example/cat.png".to_string())
//!     });
//!     let executor = TaskExecutor::new(job, adapter.clone(), listeners);
//!
//!     let task = TaskRecord::new("t-1", TaskType::TEXT_TO_IMAGE, "user-1");
//!     let outcome = executor.execute(task).await?;
//!     assert!(matches!(outcome, ExecutionOutcome::Succeeded(_)));
//!
//!     let mut stored = TaskRecord::new("t-1", TaskType::TEXT_TO_IMAGE, "user-1");
//!     assert_eq!(executor.update_task_status(&mut stored).await?, Some(TaskStatus::Success));
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod executor;
mod listeners;
mod network;
mod policies;
mod status;
mod tasks;

// ---- Public re-exports ----

pub use config::ExecutorConfig;
pub use error::TaskError;
pub use events::TaskEvent;
pub use executor::{ExecutionOutcome, ExecutorCallback, Job, JobContext, JobFn, TaskExecutor};
pub use listeners::{ListenerRef, ListenerRegistry, TaskListener};
pub use network::Envelope;
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use status::{TaskStatus, TaskType};
pub use tasks::{MemoryStore, RecordAdapter, StoreRecord, TaskAdapter, TaskClass, TaskRecord, TaskStore};

// Optional: expose a tracing-backed listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogListener;
