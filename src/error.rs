//! Error type shared by the executor, retry policy, adapters and storage.
//!
//! [`TaskError`] groups failures into the classes the retry policy cares about:
//!
//! - **network transient** (`Timeout`, `Connection`): retried by
//!   [`RetryPolicy::network`](crate::RetryPolicy::network);
//! - **file transient** (`NotFound`, `Io`, `PermissionDenied`): retried by
//!   [`RetryPolicy::file_io`](crate::RetryPolicy::file_io);
//! - **domain** (`Remote`, `Storage`, `Fail`, `Fatal`, transition errors);
//! - **cancellation** (`Canceled`), which is never a failure.
//!
//! Only the `Display` text of an error is ever written to a task record.

use std::io;

use thiserror::Error;

use crate::status::{TaskStatus, TaskType};

/// # Errors produced while running tasks.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// An operation (network call or whole job) ran out of time.
    #[error("timed out: {reason}")]
    Timeout { reason: String },

    /// Connection could not be established or was dropped.
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    /// A file or remote resource does not exist (yet).
    #[error("not found: {reason}")]
    NotFound { reason: String },

    /// Generic I/O failure.
    #[error("i/o error: {reason}")]
    Io { reason: String },

    /// Access to a file was denied.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Remote service answered with a non-zero envelope code.
    #[error("remote error {code}: {}", message.as_deref().unwrap_or("no message"))]
    Remote { code: i32, message: Option<String> },

    /// Storage collaborator rejected an operation.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// Job failed but the failure is not known to be permanent.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// Job failed and must not be retried.
    #[error("fatal error (no retry): {reason}")]
    Fatal { reason: String },

    /// Execution observed a cancellation request.
    #[error("task cancelled")]
    Canceled,

    /// Status change rejected by the lifecycle rules.
    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// Progress reported for a task that is not `RUNNING`.
    #[error("task is not running (status {status})")]
    NotRunning { status: TaskStatus },

    /// Executor does not handle this kind of task.
    #[error("unsupported task type {task_type}")]
    UnsupportedType { task_type: TaskType },

    /// Task id already has an execution in flight.
    #[error("task {task_id} is already executing")]
    AlreadyActive { task_id: String },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(reason: impl Into<String>) -> Self {
        TaskError::Fatal {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Timeout`].
    pub fn timeout(reason: impl Into<String>) -> Self {
        TaskError::Timeout {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Connection`].
    pub fn connection(reason: impl Into<String>) -> Self {
        TaskError::Connection {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Storage`].
    pub fn storage(reason: impl Into<String>) -> Self {
        TaskError::Storage {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gentask::TaskError;
    ///
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// assert_eq!(TaskError::timeout("slow").as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Connection { .. } => "task_connection",
            TaskError::NotFound { .. } => "task_not_found",
            TaskError::Io { .. } => "task_io",
            TaskError::PermissionDenied { .. } => "task_permission_denied",
            TaskError::Remote { .. } => "task_remote",
            TaskError::Storage { .. } => "task_storage",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
            TaskError::InvalidTransition { .. } => "task_invalid_transition",
            TaskError::NotRunning { .. } => "task_not_running",
            TaskError::UnsupportedType { .. } => "task_unsupported_type",
            TaskError::AlreadyActive { .. } => "task_already_active",
        }
    }

    /// Timeout or connection-class failure.
    pub fn is_network_transient(&self) -> bool {
        matches!(self, TaskError::Timeout { .. } | TaskError::Connection { .. })
    }

    /// Not-found, I/O or permission-class failure.
    pub fn is_file_transient(&self) -> bool {
        matches!(
            self,
            TaskError::NotFound { .. } | TaskError::Io { .. } | TaskError::PermissionDenied { .. }
        )
    }

    /// Indicates whether the error is worth another attempt.
    ///
    /// `Fatal`, `Canceled` and the lifecycle/wiring errors are never retryable.
    ///
    /// # Example
    /// ```
    /// use gentask::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// assert!(!TaskError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.is_network_transient()
            || self.is_file_transient()
            || matches!(
                self,
                TaskError::Remote { .. } | TaskError::Storage { .. } | TaskError::Fail { .. }
            )
    }

    /// `true` only for [`TaskError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

impl From<io::Error> for TaskError {
    fn from(err: io::Error) -> Self {
        let reason = err.to_string();
        match err.kind() {
            io::ErrorKind::TimedOut => TaskError::Timeout { reason },
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => TaskError::Connection { reason },
            io::ErrorKind::NotFound => TaskError::NotFound { reason },
            io::ErrorKind::PermissionDenied => TaskError::PermissionDenied { reason },
            _ => TaskError::Io { reason },
        }
    }
}
