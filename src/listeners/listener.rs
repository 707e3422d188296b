//! # Listener trait
//!
//! `TaskListener` is the extension point for reacting to task lifecycle
//! events (UI refresh, notifications, metrics). Every hook has an empty
//! default, so implementors override only what they need.
//!
//! ## Contract
//! - Hooks are awaited inline by the [`ListenerRegistry`](crate::ListenerRegistry);
//!   keep them short and hand heavy work to a spawned task.
//! - A panicking hook is isolated: it is logged and delivery continues with the
//!   next listener.
//! - Events are read-only; listeners never mutate tasks.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use gentask::{TaskEvent, TaskListener};
//!
//! struct Badge;
//!
//! #[async_trait]
//! impl TaskListener for Badge {
//!     async fn on_task_status_changed(&self, event: &TaskEvent) {
//!         if event.is_completed() {
//!             // bump unread badge...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "badge" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::TaskEvent;

/// Observer of task lifecycle events.
#[async_trait]
pub trait TaskListener: Send + Sync + 'static {
    /// A task was registered with an executor for the first time.
    async fn on_task_added(&self, _event: &TaskEvent) {}

    /// Status or progress of a task changed.
    async fn on_task_status_changed(&self, _event: &TaskEvent) {}

    /// A batch of tasks was removed.
    async fn on_tasks_removed(&self, _events: &[TaskEvent]) {}

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
