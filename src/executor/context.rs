//! # Per-execution state and the handle given to job bodies.
//!
//! ```text
//! TaskExecutor::execute(task)
//!     └─► Execution<T> { task: Mutex<T>, token, adapter, listeners, callback }
//!            ├─► in-flight table (cancel / cancel_all)
//!            └─► JobContext<T> ──► Job::run(ctx)
//!                   ├─ checkpoint()/sleep()   cancellation points
//!                   ├─ set_progress(p)        mutate → persist → notify → callback
//!                   └─ retry(&policy, op)     cancellable retry
//! ```
//!
//! The task value lives behind a short-lived `std::sync::Mutex`: it is mutated
//! and cloned under the lock, then persisted and published from the clone.
//!
//! Every write path (progress, terminal transition, removal) first takes the
//! per-execution `writes` lock, an async mutex held from the mutation until
//! the storage write and the notification are done. Storage therefore sees
//! writes in the same order as the in-memory task, even when several
//! `JobContext` clones report progress at once.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::TaskEvent;
use crate::executor::callback::ExecutorCallback;
use crate::listeners::ListenerRegistry;
use crate::policies::RetryPolicy;
use crate::tasks::TaskAdapter;

/// State of one in-flight execution.
pub(crate) struct Execution<T: Send + Sync + 'static> {
    pub(crate) task_id: String,
    /// Cancelled by `TaskExecutor::cancel*`.
    pub(crate) token: CancellationToken,
    task: Mutex<T>,
    /// Serializes mutate → persist → notify sequences.
    writes: AsyncMutex<()>,
    adapter: Arc<dyn TaskAdapter<T>>,
    listeners: Arc<ListenerRegistry>,
    callback: Option<Arc<dyn ExecutorCallback>>,
}

impl<T: Clone + Send + Sync + 'static> Execution<T> {
    pub(crate) fn new(
        task: T,
        adapter: Arc<dyn TaskAdapter<T>>,
        listeners: Arc<ListenerRegistry>,
        callback: Option<Arc<dyn ExecutorCallback>>,
    ) -> Self {
        Self {
            task_id: adapter.task_id(&task),
            token: CancellationToken::new(),
            task: Mutex::new(task),
            writes: AsyncMutex::new(()),
            adapter,
            listeners,
            callback,
        }
    }

    pub(crate) fn adapter(&self) -> &Arc<dyn TaskAdapter<T>> {
        &self.adapter
    }

    pub(crate) fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub(crate) fn snapshot(&self) -> T {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `f` against the task under the lock and returns its output plus a
    /// snapshot taken after the mutation.
    pub(crate) fn apply<R>(
        &self,
        f: impl FnOnce(&dyn TaskAdapter<T>, &mut T) -> Result<R, TaskError>,
    ) -> Result<(R, T), TaskError> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(self.adapter.as_ref(), &mut *task)?;
        Ok((out, task.clone()))
    }

    /// Waits for exclusive write access to this execution's task.
    pub(crate) async fn write_order(&self) -> AsyncMutexGuard<'_, ()> {
        self.writes.lock().await
    }

    /// Writes `snapshot` to storage.
    pub(crate) async fn persist(&self, snapshot: &T) -> Result<(), TaskError> {
        self.adapter.update_task(snapshot).await
    }

    /// Builds the event for `snapshot` and notifies listeners.
    pub(crate) async fn announce(&self, snapshot: T) -> TaskEvent {
        let event = TaskEvent::new(snapshot, Arc::clone(&self.adapter));
        self.listeners.notify_task_status_changed(&event).await;
        event
    }

    /// Persists `snapshot` through the adapter, then notifies listeners.
    pub(crate) async fn publish(&self, snapshot: T) -> Result<TaskEvent, TaskError> {
        self.persist(&snapshot).await?;
        Ok(self.announce(snapshot).await)
    }

    /// Invokes a callback hook, isolating panics.
    pub(crate) fn fire(&self, hook: &'static str, f: impl FnOnce(&dyn ExecutorCallback)) {
        let Some(cb) = self.callback.as_deref() else {
            return;
        };
        if std::panic::catch_unwind(AssertUnwindSafe(|| f(cb))).is_err() {
            tracing::warn!(task_id = %self.task_id, hook, "executor callback panicked");
        }
    }
}

/// Handle passed to [`Job::run`](crate::Job::run).
///
/// Cheap to clone; all clones observe the same task and cancellation token.
pub struct JobContext<T: Send + Sync + 'static> {
    exec: Arc<Execution<T>>,
    token: CancellationToken,
}

impl<T: Send + Sync + 'static> Clone for JobContext<T> {
    fn clone(&self) -> Self {
        Self {
            exec: Arc::clone(&self.exec),
            token: self.token.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> JobContext<T> {
    pub(crate) fn new(exec: Arc<Execution<T>>, token: CancellationToken) -> Self {
        Self { exec, token }
    }

    pub fn task_id(&self) -> &str {
        &self.exec.task_id
    }

    /// Current in-memory copy of the task.
    pub fn task(&self) -> T {
        self.exec.snapshot()
    }

    /// Token cancelled on `cancel()` or job timeout.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancellation point: `Err(Canceled)` once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `delay` unless cancelled first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), TaskError> {
        select! {
            _ = time::sleep(delay) => Ok(()),
            _ = self.token.cancelled() => Err(TaskError::Canceled),
        }
    }

    /// Reports progress (`0..=100`, never decreasing).
    ///
    /// Checks cancellation first; a cancelled job performs no further
    /// mutation. When the stored value changes it is persisted, listeners get
    /// a status-changed event and the callback gets `on_progress_update`.
    pub async fn set_progress(&self, percent: u8) -> Result<(), TaskError> {
        self.checkpoint()?;
        let _order = self.exec.write_order().await;
        self.checkpoint()?;
        let (changed, snapshot) = self.exec.apply(|a, t| a.set_progress(t, percent))?;
        if !changed {
            return Ok(());
        }
        let event = self.exec.publish(snapshot).await?;
        let progress = event.progress();
        self.exec
            .fire("on_progress_update", |cb| cb.on_progress_update(&event, progress));
        Ok(())
    }

    /// Runs `op` under `policy`, aborting backoff sleeps on cancellation.
    pub async fn retry<R, F, Fut>(&self, policy: &RetryPolicy, op: F) -> Result<R, TaskError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, TaskError>>,
    {
        policy.run_cancellable(&self.token, op).await
    }
}
