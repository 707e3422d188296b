//! # TaskExecutor: drives one task through its lifecycle.
//!
//! ## Lifecycle
//! ```text
//! execute(task)
//!   ├─► reject unsupported type / id already in flight
//!   ├─► stored and not CREATE?  reject (InvalidTransition)
//!   ├─► unknown to storage?  save_task ─► notify_task_added
//!   ├─► mark_started  ─► update_task ─► notify_task_status_changed ─► cb.on_status_changed
//!   ├─► Job::run(ctx)              (optional timeout, panic isolated)
//!   │      ├─ ctx.set_progress(p)  ─► update ─► notify ─► cb.on_progress_update
//!   │      └─ ctx.checkpoint()/sleep()/retry()  cancellation points
//!   │
//!   ├─ cancelled ─────────────► ExecutionOutcome::Cancelled     (no mutation)
//!   ├─ Ok(payload) ─► mark_success ─► update ─► notify ─► cb.on_success
//!   └─ Err(e) ──────► mark_failure(e.to_string()) ─► update ─► notify ─► cb.on_failure
//!
//! remove(tasks) ─► cancel ─► mark_deleted ─► update (soft delete) ─► notify_tasks_removed
//! ```
//!
//! ## Rules
//! - One execution per task id per executor; a second `execute` for an id in
//!   flight fails with [`TaskError::AlreadyActive`].
//! - Cancellation is cooperative and never reported as failure.
//! - A failed storage write of `SUCCESS`/`FAILURE` is logged; listeners and the
//!   callback are still told about the terminal state.
//! - Executions are not pooled: every `execute`/`spawn` runs concurrently with
//!   the others. Capping concurrency is up to the caller.
//! - Routing a task to the executor that supports its type is up to the caller.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::ExecutorConfig;
use crate::error::TaskError;
use crate::events::TaskEvent;
use crate::executor::callback::ExecutorCallback;
use crate::executor::context::{Execution, JobContext};
use crate::executor::job::Job;
use crate::listeners::ListenerRegistry;
use crate::status::{TaskStatus, TaskType};
use crate::tasks::TaskAdapter;

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Task is `SUCCESS` with this payload.
    Succeeded(String),
    /// Task is `FAILURE` with this reason.
    Failed(String),
    /// Cancellation was observed; the task keeps its last checkpointed state.
    Cancelled,
}

/// Execution engine for the task types supported by its [`Job`].
pub struct TaskExecutor<T: Clone + Send + Sync + 'static> {
    job: Arc<dyn Job<T>>,
    adapter: RwLock<Arc<dyn TaskAdapter<T>>>,
    callback: RwLock<Option<Arc<dyn ExecutorCallback>>>,
    listeners: Arc<ListenerRegistry>,
    config: ExecutorConfig,
    in_flight: Mutex<HashMap<String, Arc<Execution<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> TaskExecutor<T> {
    /// Creates an executor with [`ExecutorConfig::default`] and no callback.
    pub fn new(
        job: Arc<dyn Job<T>>,
        adapter: Arc<dyn TaskAdapter<T>>,
        listeners: Arc<ListenerRegistry>,
    ) -> Self {
        Self {
            job,
            adapter: RwLock::new(adapter),
            callback: RwLock::new(None),
            listeners,
            config: ExecutorConfig::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a callback.
    pub fn with_callback(self, callback: Arc<dyn ExecutorCallback>) -> Self {
        self.set_callback(callback);
        self
    }

    /// Replaces the callback used by executions started from now on.
    pub fn set_callback(&self, callback: Arc<dyn ExecutorCallback>) {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Replaces the adapter used by executions started from now on.
    pub fn set_adapter(&self, adapter: Arc<dyn TaskAdapter<T>>) {
        *self.adapter.write().unwrap_or_else(PoisonError::into_inner) = adapter;
    }

    pub fn adapter(&self) -> Arc<dyn TaskAdapter<T>> {
        Arc::clone(&self.adapter.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn callback(&self) -> Option<Arc<dyn ExecutorCallback>> {
        self.callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn is_supported_task_type(&self, task_type: TaskType) -> bool {
        self.job.supported_types().contains(&task_type)
    }

    pub fn supported_task_types(&self) -> Vec<TaskType> {
        self.job.supported_types().to_vec()
    }

    /// Sorted ids of tasks currently executing.
    pub fn active_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.table().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Execution<T>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `task` to completion on the tokio runtime.
    pub fn spawn(self: &Arc<Self>, task: T) -> JoinHandle<Result<ExecutionOutcome, TaskError>> {
        let me = Arc::clone(self);
        tokio::spawn(async move { me.execute(task).await })
    }

    /// Runs `task` to completion, cancellation or failure.
    ///
    /// `Err` is returned only when the execution could not be driven at all
    /// (unsupported type, duplicate id, illegal starting status, storage
    /// failure). Job failures are reported as [`ExecutionOutcome::Failed`].
    pub async fn execute(&self, task: T) -> Result<ExecutionOutcome, TaskError> {
        let adapter = self.adapter();
        let task_type = adapter.task_type(&task);
        if !self.is_supported_task_type(task_type) {
            return Err(TaskError::UnsupportedType { task_type });
        }

        let exec = Arc::new(Execution::new(
            task,
            adapter,
            Arc::clone(&self.listeners),
            self.callback(),
        ));
        {
            let mut table = self.table();
            if table.contains_key(&exec.task_id) {
                return Err(TaskError::AlreadyActive {
                    task_id: exec.task_id.clone(),
                });
            }
            table.insert(exec.task_id.clone(), Arc::clone(&exec));
        }

        let res = self.drive(&exec, task_type).await;

        let mut table = self.table();
        if table
            .get(&exec.task_id)
            .is_some_and(|current| Arc::ptr_eq(current, &exec))
        {
            table.remove(&exec.task_id);
        }
        res
    }

    async fn drive(
        &self,
        exec: &Arc<Execution<T>>,
        task_type: TaskType,
    ) -> Result<ExecutionOutcome, TaskError> {
        let adapter = Arc::clone(exec.adapter());
        let task_id = exec.task_id.as_str();

        let start_order = exec.write_order().await;
        if exec.token.is_cancelled() {
            return Ok(ExecutionOutcome::Cancelled);
        }
        match adapter.find_task(task_id).await? {
            Some(stored) => {
                let from = adapter.status(&stored);
                if from != TaskStatus::Create {
                    tracing::warn!(task_id, %from, "refusing to restart a stored task");
                    return Err(TaskError::InvalidTransition {
                        from,
                        to: TaskStatus::Running,
                    });
                }
            }
            None => {
                let snapshot = exec.snapshot();
                adapter.save_task(&snapshot).await?;
                let event = TaskEvent::new(snapshot, Arc::clone(&adapter));
                exec.listeners().notify_task_added(&event).await;
            }
        }

        let ((), snapshot) = exec.apply(|a, t| a.mark_started(t))?;
        let event = exec.publish(snapshot).await?;
        exec.fire("on_status_changed", |cb| cb.on_status_changed(&event));
        if self.config.progress_on_start {
            exec.fire("on_progress_update", |cb| {
                cb.on_progress_update(&event, event.progress())
            });
        }
        tracing::info!(task_id, %task_type, "task started");
        drop(start_order);

        let job_token = exec.token.child_token();
        let ctx = JobContext::new(Arc::clone(exec), job_token.clone());
        let run = AssertUnwindSafe(self.job.run(ctx)).catch_unwind();

        let caught = match self.config.job_timeout() {
            Some(limit) => match time::timeout(limit, run).await {
                Ok(caught) => caught,
                Err(_elapsed) => {
                    job_token.cancel();
                    Ok(Err(TaskError::timeout(format!("job exceeded {limit:?}"))))
                }
            },
            None => run.await,
        };
        let result = caught.unwrap_or_else(|panic| {
            let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = panic.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(TaskError::fatal(format!("job panicked: {info}")))
        });

        let _order = exec.write_order().await;
        if exec.token.is_cancelled() || matches!(result, Err(TaskError::Canceled)) {
            tracing::info!(task_id, %task_type, "task cancelled");
            return Ok(ExecutionOutcome::Cancelled);
        }

        match result {
            Ok(payload) => {
                let ((), snapshot) = exec.apply(|a, t| a.mark_success(t, payload.clone()))?;
                let event = Self::finish(exec, snapshot).await;
                exec.fire("on_success", |cb| cb.on_success(&event));
                tracing::info!(task_id, %task_type, "task succeeded");
                Ok(ExecutionOutcome::Succeeded(payload))
            }
            Err(err) => {
                let reason = err.to_string();
                let ((), snapshot) = exec.apply(|a, t| a.mark_failure(t, &reason))?;
                let event = Self::finish(exec, snapshot).await;
                exec.fire("on_failure", |cb| cb.on_failure(&event, &reason));
                tracing::warn!(task_id, %task_type, error = %reason, label = err.as_label(), "task failed");
                Ok(ExecutionOutcome::Failed(reason))
            }
        }
    }

    /// Persists a terminal snapshot and notifies listeners.
    ///
    /// A failed storage write is logged; listeners and the callback still see
    /// the terminal state held in memory.
    async fn finish(exec: &Execution<T>, snapshot: T) -> TaskEvent {
        if let Err(err) = exec.persist(&snapshot).await {
            tracing::error!(
                task_id = %exec.task_id,
                error = %err,
                label = err.as_label(),
                "failed to persist terminal status"
            );
        }
        exec.announce(snapshot).await
    }

    /// Requests cancellation of the in-flight execution of `task`.
    ///
    /// Returns `true` if a signal was delivered, `false` if the task is not
    /// executing here or was already cancelled. The job stops at its next
    /// checkpoint.
    pub fn cancel(&self, task: &T) -> bool {
        let task_id = self.adapter().task_id(task);
        self.cancel_by_id(&task_id)
    }

    /// [`cancel`](Self::cancel) by task id.
    pub fn cancel_by_id(&self, task_id: &str) -> bool {
        let table = self.table();
        match table.get(task_id) {
            Some(exec) if !exec.token.is_cancelled() => {
                exec.token.cancel();
                tracing::info!(task_id, "cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Cancels every in-flight execution. Returns `true` if at least one
    /// signal was delivered.
    pub fn cancel_all(&self) -> bool {
        let table = self.table();
        let mut delivered = false;
        for exec in table.values() {
            if !exec.token.is_cancelled() {
                exec.token.cancel();
                delivered = true;
            }
        }
        delivered
    }

    /// Reloads `task` from storage.
    ///
    /// Returns the stored status, or `None` (leaving `task` untouched) when
    /// storage no longer knows the id.
    pub async fn update_task_status(&self, task: &mut T) -> Result<Option<TaskStatus>, TaskError> {
        let adapter = self.adapter();
        let task_id = adapter.task_id(task);
        match adapter.find_task(&task_id).await? {
            Some(stored) => {
                *task = stored;
                Ok(Some(adapter.status(task)))
            }
            None => Ok(None),
        }
    }

    /// Soft-deletes `tasks`: cancels their executions, moves them to `DELETE`,
    /// persists the change and raises one removal batch.
    ///
    /// A task executing here is deleted from its in-memory copy, after any
    /// write already in progress for it; the caller's copy is used otherwise.
    /// Records stay in storage with their soft-delete flag set.
    ///
    /// Do not call this from a listener hook for a task executing here: the
    /// hook runs inside that task's write and the removal would wait on it.
    pub async fn remove(&self, tasks: Vec<T>) -> Result<Vec<TaskEvent>, TaskError> {
        let adapter = self.adapter();
        let mut events = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            let task_id = adapter.task_id(&task);
            let running = self.table().get(&task_id).cloned();
            let snapshot = match running {
                Some(exec) => {
                    exec.token.cancel();
                    let _order = exec.write_order().await;
                    let ((), snapshot) = exec.apply(|a, t| a.mark_deleted(t))?;
                    adapter.update_task(&snapshot).await?;
                    snapshot
                }
                None => {
                    adapter.mark_deleted(&mut task)?;
                    adapter.update_task(&task).await?;
                    task
                }
            };
            events.push(TaskEvent::new(snapshot, Arc::clone(&adapter)));
        }
        self.listeners.notify_tasks_removed(&events).await;
        tracing::info!(count = events.len(), "tasks removed");
        Ok(events)
    }
}
