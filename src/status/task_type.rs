//! # Job kinds.
//!
//! [`TaskType`] is an *open* enumeration: a transparent `i32` newtype with a
//! few well-known constants. New kinds are just new codes; nothing in the
//! executor or listener registry matches on them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer-coded job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(pub i32);

impl TaskType {
    pub const TEXT_TO_IMAGE: TaskType = TaskType(1);
    pub const VIDEO_GENERATION: TaskType = TaskType(2);
    pub const VIDEO_EDIT: TaskType = TaskType(3);
    pub const ORAL_BROADCAST: TaskType = TaskType(4);
    pub const PICTURE_TO_VIDEO: TaskType = TaskType(5);

    /// Raw code.
    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    /// Label for well-known kinds, `None` for application-defined ones.
    pub fn label(self) -> Option<&'static str> {
        match self {
            TaskType::TEXT_TO_IMAGE => Some("text_to_image"),
            TaskType::VIDEO_GENERATION => Some("video_generation"),
            TaskType::VIDEO_EDIT => Some("video_edit"),
            TaskType::ORAL_BROADCAST => Some("oral_broadcast"),
            TaskType::PICTURE_TO_VIDEO => Some("picture_to_video"),
            _ => None,
        }
    }
}

impl From<i32> for TaskType {
    fn from(code: i32) -> Self {
        TaskType(code)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "type#{}", self.0),
        }
    }
}
