//! # Task events delivered to listeners.
//!
//! A [`TaskEvent`] pairs a snapshot of one task with the adapter that knows how
//! to read it, and erases the concrete task type. Listeners therefore see the
//! same read-only accessors for every entity type and cannot mutate the task.
//!
//! ## Identity
//! Two events are equal when they refer to the same task id **and** the same
//! concrete task type ([`TaskClass`]). Status, progress and sequence number do
//! not take part, so duplicate notifications for one logical task compare equal.
//!
//! ## Ordering
//! Each event gets a process-wide monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use gentask::{
//!     MemoryStore, RecordAdapter, TaskAdapter, TaskEvent, TaskRecord, TaskStatus, TaskType,
//! };
//!
//! let adapter: Arc<dyn TaskAdapter<TaskRecord>> =
//!     Arc::new(RecordAdapter::new(Arc::new(MemoryStore::<TaskRecord>::new())));
//! let rec = TaskRecord::new("t-9", TaskType::VIDEO_EDIT, "u-1");
//!
//! let ev = TaskEvent::new(rec.clone(), adapter.clone());
//! assert_eq!(ev.task_id(), "t-9");
//! assert_eq!(ev.status(), TaskStatus::Create);
//! assert!(ev.is_active());
//! assert_eq!(ev.task::<TaskRecord>().map(|r| r.user_id.as_str()), Some("u-1"));
//! assert_eq!(ev, TaskEvent::new(rec, adapter));
//! ```

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::status::{TaskStatus, TaskType};
use crate::tasks::{TaskAdapter, TaskClass};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Type-erased read view over `(task, adapter)`.
trait TaskView: Send + Sync {
    fn task_type(&self) -> TaskType;
    fn status(&self) -> TaskStatus;
    fn progress(&self) -> u8;
    fn task_class(&self) -> TaskClass;
    fn as_any(&self) -> &dyn Any;
}

struct Bound<T: Send + Sync + 'static> {
    task: T,
    adapter: Arc<dyn TaskAdapter<T>>,
}

impl<T: Send + Sync + 'static> TaskView for Bound<T> {
    fn task_type(&self) -> TaskType {
        self.adapter.task_type(&self.task)
    }

    fn status(&self) -> TaskStatus {
        self.adapter.status(&self.task)
    }

    fn progress(&self) -> u8 {
        self.adapter.progress(&self.task)
    }

    fn task_class(&self) -> TaskClass {
        self.adapter.task_class()
    }

    fn as_any(&self) -> &dyn Any {
        &self.task
    }
}

/// Immutable notification envelope.
#[derive(Clone)]
pub struct TaskEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock creation time.
    pub at: SystemTime,
    task_id: Arc<str>,
    view: Arc<dyn TaskView>,
}

impl TaskEvent {
    /// Wraps a snapshot of `task` with its adapter.
    pub fn new<T>(task: T, adapter: Arc<dyn TaskAdapter<T>>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let task_id: Arc<str> = adapter.task_id(&task).into();
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            task_id,
            view: Arc::new(Bound { task, adapter }),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn task_type(&self) -> TaskType {
        self.view.task_type()
    }

    pub fn status(&self) -> TaskStatus {
        self.view.status()
    }

    pub fn progress(&self) -> u8 {
        self.view.progress()
    }

    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TaskStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status() == TaskStatus::Failure
    }

    pub fn task_class(&self) -> TaskClass {
        self.view.task_class()
    }

    /// Read-only access to the concrete task, if it is a `T`.
    pub fn task<T: 'static>(&self) -> Option<&T> {
        self.view.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for TaskEvent {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id && self.task_class() == other.task_class()
    }
}

impl Eq for TaskEvent {}

impl Hash for TaskEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.task_id.hash(state);
        self.task_class().hash(state);
    }
}

impl fmt::Debug for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEvent")
            .field("seq", &self.seq)
            .field("task_id", &self.task_id)
            .field("task_type", &self.task_type())
            .field("status", &self.status())
            .field("progress", &self.progress())
            .finish()
    }
}
