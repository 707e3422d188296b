//! # LogListener: tracing-backed event printer
//!
//! A minimal listener that renders every [`TaskEvent`] as a `tracing` line.
//! Use it for demos and debugging.
//!
//! ## Example output
//! ```text
//! INFO task added task_id="t-1" task_type=text_to_image status=CREATE
//! INFO task changed task_id="t-1" task_type=text_to_image status=RUNNING progress=40
//! INFO tasks removed count=2
//! ```

use async_trait::async_trait;

use crate::events::TaskEvent;
use crate::listeners::TaskListener;

/// Event logging listener.
#[derive(Default)]
pub struct LogListener;

impl LogListener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskListener for LogListener {
    async fn on_task_added(&self, e: &TaskEvent) {
        tracing::info!(
            task_id = e.task_id(),
            task_type = %e.task_type(),
            status = %e.status(),
            "task added"
        );
    }

    async fn on_task_status_changed(&self, e: &TaskEvent) {
        if e.is_failed() {
            tracing::warn!(task_id = e.task_id(), task_type = %e.task_type(), "task failed");
        } else {
            tracing::info!(
                task_id = e.task_id(),
                task_type = %e.task_type(),
                status = %e.status(),
                progress = e.progress(),
                "task changed"
            );
        }
    }

    async fn on_tasks_removed(&self, events: &[TaskEvent]) {
        let ids: Vec<&str> = events.iter().map(TaskEvent::task_id).collect();
        tracing::info!(count = events.len(), ?ids, "tasks removed");
    }

    fn name(&self) -> &'static str {
        "LogListener"
    }
}
