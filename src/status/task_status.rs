//! # Lifecycle states of a task.
//!
//! [`TaskStatus`] is a closed enumeration. Each state carries a stable integer
//! code that the storage layer persists.
//!
//! # Example
//! ```rust
//! use gentask::TaskStatus;
//!
//! assert!(TaskStatus::Create.can_transition_to(TaskStatus::Running));
//! assert!(!TaskStatus::Create.can_transition_to(TaskStatus::Success));
//! assert!(TaskStatus::Success.can_transition_to(TaskStatus::Delete));
//! assert_eq!(TaskStatus::from_code(3), Some(TaskStatus::Failure));
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a task.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created by the caller, not yet picked up.
    #[default]
    Create,
    /// An execution currently owns the task.
    Running,
    /// Finished with a result payload.
    Success,
    /// Finished with a failure reason.
    Failure,
    /// Soft-deleted. Reachable from every state.
    Delete,
}

impl TaskStatus {
    /// Stable integer code used by persisted records.
    pub fn code(self) -> i32 {
        match self {
            TaskStatus::Create => 0,
            TaskStatus::Running => 1,
            TaskStatus::Success => 2,
            TaskStatus::Failure => 3,
            TaskStatus::Delete => 4,
        }
    }

    /// Inverse of [`TaskStatus::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TaskStatus::Create),
            1 => Some(TaskStatus::Running),
            2 => Some(TaskStatus::Success),
            3 => Some(TaskStatus::Failure),
            4 => Some(TaskStatus::Delete),
            _ => None,
        }
    }

    /// `true` for `SUCCESS`, `FAILURE` and `DELETE`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Delete
        )
    }

    /// `true` for `CREATE` and `RUNNING`.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Create | TaskStatus::Running)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// - `RUNNING` only from `CREATE`
    /// - `SUCCESS`/`FAILURE` only from `RUNNING`
    /// - `DELETE` from anything (including itself, as a no-op)
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match next {
            TaskStatus::Create => false,
            TaskStatus::Running => self == TaskStatus::Create,
            TaskStatus::Success | TaskStatus::Failure => self == TaskStatus::Running,
            TaskStatus::Delete => true,
        }
    }
}
