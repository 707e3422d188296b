//! # Task adapter: the core's only view of a concrete task entity.
//!
//! The executor, retry policy and listener registry never touch a concrete
//! task type. Everything they need goes through [`TaskAdapter`]:
//!
//! ```text
//!              ┌──────────────────── TaskAdapter<T> ────────────────────┐
//!  accessors:  │ task_id · task_type · status · progress                │
//!  primitives: │ write_status · write_progress · write_result           │
//!  storage:    │ save_task · update_task · delete_tasks · find_task ... │
//!  provided:   │ mark_started · mark_success · mark_failure · ...       │
//!              └────────────────────────────────────────────────────────┘
//! ```
//!
//! The provided `mark_*` methods enforce the lifecycle rules of
//! [`TaskStatus::can_transition_to`], so an adapter only has to implement the
//! raw field writes. Adding a new persisted entity means writing one adapter.

use std::any::{type_name, TypeId};
use std::slice;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::status::{TaskStatus, TaskType};
use crate::tasks::record::TaskRecord;
use crate::tasks::store::TaskStore;

/// Runtime descriptor of a concrete task entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskClass {
    id: TypeId,
    name: &'static str,
}

impl TaskClass {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// Capability interface over a concrete task type `T`.
#[async_trait]
pub trait TaskAdapter<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    fn task_id(&self, task: &T) -> String;

    fn task_type(&self, task: &T) -> TaskType;

    fn status(&self, task: &T) -> TaskStatus;

    /// Percentage in `0..=100`.
    fn progress(&self, task: &T) -> u8;

    /// Raw status write. Callers go through the `mark_*` methods.
    fn write_status(&self, task: &mut T, status: TaskStatus);

    /// Raw progress write.
    fn write_progress(&self, task: &mut T, percent: u8);

    /// Raw result/notes write.
    fn write_result(&self, task: &mut T, result: Option<String>);

    /// Insert or overwrite.
    async fn save_task(&self, task: &T) -> Result<(), TaskError>;

    async fn update_task(&self, task: &T) -> Result<(), TaskError>;

    async fn delete_tasks(&self, tasks: &[T]) -> Result<(), TaskError>;

    async fn delete_task(&self, task: &T) -> Result<(), TaskError> {
        self.delete_tasks(slice::from_ref(task)).await
    }

    async fn load_all_tasks(&self) -> Result<Vec<T>, TaskError>;

    /// `Ok(None)` when the id is unknown.
    async fn find_task(&self, task_id: &str) -> Result<Option<T>, TaskError>;

    /// Moves `task` to `to` if the lifecycle allows it.
    fn transition(&self, task: &mut T, to: TaskStatus) -> Result<(), TaskError> {
        let from = self.status(task);
        if !from.can_transition_to(to) {
            tracing::warn!(
                task_id = %self.task_id(task),
                %from,
                %to,
                "rejected status transition"
            );
            return Err(TaskError::InvalidTransition { from, to });
        }
        self.write_status(task, to);
        Ok(())
    }

    /// `CREATE -> RUNNING`.
    fn mark_started(&self, task: &mut T) -> Result<(), TaskError> {
        self.transition(task, TaskStatus::Running)
    }

    /// `RUNNING -> SUCCESS`, storing `result` and completing progress.
    fn mark_success(&self, task: &mut T, result: String) -> Result<(), TaskError> {
        self.transition(task, TaskStatus::Success)?;
        self.write_progress(task, 100);
        self.write_result(task, Some(result));
        Ok(())
    }

    /// `RUNNING -> FAILURE`, storing a human-readable `reason`.
    fn mark_failure(&self, task: &mut T, reason: &str) -> Result<(), TaskError> {
        self.transition(task, TaskStatus::Failure)?;
        self.write_result(task, Some(reason.to_owned()));
        Ok(())
    }

    /// `* -> DELETE`.
    fn mark_deleted(&self, task: &mut T) -> Result<(), TaskError> {
        self.transition(task, TaskStatus::Delete)
    }

    /// Records progress for a `RUNNING` task.
    ///
    /// Values above 100 are clamped; values below the current progress are
    /// ignored. Returns whether the stored progress changed.
    fn set_progress(&self, task: &mut T, percent: u8) -> Result<bool, TaskError> {
        let status = self.status(task);
        if status != TaskStatus::Running {
            return Err(TaskError::NotRunning { status });
        }
        let percent = percent.min(100);
        if percent <= self.progress(task) {
            return Ok(false);
        }
        self.write_progress(task, percent);
        Ok(true)
    }

    fn is_active(&self, task: &T) -> bool {
        self.status(task).is_active()
    }

    fn is_completed(&self, task: &T) -> bool {
        self.status(task) == TaskStatus::Success
    }

    fn is_failed(&self, task: &T) -> bool {
        self.status(task) == TaskStatus::Failure
    }

    fn task_class(&self) -> TaskClass {
        TaskClass::of::<T>()
    }
}

/// [`TaskAdapter`] for [`TaskRecord`] backed by any [`TaskStore`].
#[derive(Clone)]
pub struct RecordAdapter {
    store: Arc<dyn TaskStore<TaskRecord>>,
}

impl RecordAdapter {
    pub fn new(store: Arc<dyn TaskStore<TaskRecord>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskAdapter<TaskRecord> for RecordAdapter {
    fn task_id(&self, task: &TaskRecord) -> String {
        task.task_id.clone()
    }

    fn task_type(&self, task: &TaskRecord) -> TaskType {
        task.task_type
    }

    fn status(&self, task: &TaskRecord) -> TaskStatus {
        task.status
    }

    fn progress(&self, task: &TaskRecord) -> u8 {
        task.progress
    }

    fn write_status(&self, task: &mut TaskRecord, status: TaskStatus) {
        task.status = status;
        task.deleted = status == TaskStatus::Delete;
    }

    fn write_progress(&self, task: &mut TaskRecord, percent: u8) {
        task.progress = percent;
    }

    fn write_result(&self, task: &mut TaskRecord, result: Option<String>) {
        task.result = result;
    }

    async fn save_task(&self, task: &TaskRecord) -> Result<(), TaskError> {
        self.store.save(task).await
    }

    async fn update_task(&self, task: &TaskRecord) -> Result<(), TaskError> {
        self.store.update(task).await
    }

    async fn delete_tasks(&self, tasks: &[TaskRecord]) -> Result<(), TaskError> {
        let ids: Vec<String> = tasks.iter().map(|t| t.task_id.clone()).collect();
        self.store.delete(&ids).await.map(|_| ())
    }

    async fn load_all_tasks(&self) -> Result<Vec<TaskRecord>, TaskError> {
        self.store.get_all().await
    }

    async fn find_task(&self, task_id: &str) -> Result<Option<TaskRecord>, TaskError> {
        self.store.get(task_id).await
    }
}
