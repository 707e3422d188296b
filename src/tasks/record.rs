//! # Reference task entity.
//!
//! [`TaskRecord`] is the shape the storage collaborator persists for
//! generation jobs. The core never depends on it directly; it is reached only
//! through [`RecordAdapter`](crate::RecordAdapter).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{TaskStatus, TaskType};
use crate::tasks::store::StoreRecord;

/// Persisted generation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Local opaque identity.
    pub id: Uuid,
    /// Server-facing task id; the storage key.
    pub task_id: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// Cover image reference (URL or local path).
    #[serde(default)]
    pub cover: Option<String>,
    /// Result payload on success, human-readable reason on failure.
    #[serde(default)]
    pub result: Option<String>,
    /// Percentage in `0..=100`.
    #[serde(default)]
    pub progress: u8,
    /// Output size in bytes, when known.
    #[serde(default)]
    pub size: Option<u64>,
    pub user_id: String,
    /// Soft-delete flag, mirrors `status == DELETE`.
    #[serde(default)]
    pub deleted: bool,
}

impl TaskRecord {
    /// New record in `CREATE` with a fresh local id and the current timestamp.
    pub fn new(task_id: impl Into<String>, task_type: TaskType, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id: task_id.into(),
            task_type,
            status: TaskStatus::Create,
            created_at: Utc::now(),
            cover: None,
            result: None,
            progress: 0,
            size: None,
            user_id: user_id.into(),
            deleted: false,
        }
    }

    /// Returns the record with a cover reference attached.
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }
}

impl StoreRecord for TaskRecord {
    fn record_key(&self) -> &str {
        &self.task_id
    }
}
