//! Task events.
//!
//! [`TaskEvent`] is the immutable envelope handed to listeners for every
//! notable transition (added, status/progress changed, removed).
//!
//! - **Publisher**: [`TaskExecutor`](crate::TaskExecutor) only.
//! - **Consumers**: [`TaskListener`](crate::TaskListener)s through the
//!   [`ListenerRegistry`](crate::ListenerRegistry).

mod event;

pub use event::TaskEvent;
