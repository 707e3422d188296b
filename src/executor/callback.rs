//! # Executor callback.
//!
//! Single-subscriber hook wired with
//! [`TaskExecutor::set_callback`](crate::TaskExecutor::set_callback). Unlike
//! listeners, callbacks are synchronous and see progress updates as well.
//!
//! `on_progress_update`, `on_success` and `on_failure` default to forwarding
//! to `on_status_changed`, so a callback interested in "anything changed" only
//! overrides that one method.

use crate::events::TaskEvent;

/// Progress/outcome hook of one executor.
pub trait ExecutorCallback: Send + Sync + 'static {
    /// Generic change notification (also fired on `RUNNING`).
    fn on_status_changed(&self, _event: &TaskEvent) {}

    fn on_progress_update(&self, event: &TaskEvent, _progress: u8) {
        self.on_status_changed(event);
    }

    fn on_success(&self, event: &TaskEvent) {
        self.on_status_changed(event);
    }

    fn on_failure(&self, event: &TaskEvent, _reason: &str) {
        self.on_status_changed(event);
    }
}
