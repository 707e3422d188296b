//! # Task listeners.
//!
//! ## Architecture
//! ```text
//! TaskExecutor ── notify_*(TaskEvent) ──► ListenerRegistry
//!                                              │
//!                                ┌─────────────┴─────────────┐
//!                                ▼                           ▼
//!                     scoped[task_type]                   global
//!                       │        │                      │        │
//!                       ▼        ▼                      ▼        ▼
//!                     UI list  Badge             LogListener   Metrics
//! ```
//!
//! - [`TaskListener`] trait with default no-op hooks
//! - [`ListenerRegistry`] copy-on-write registry with scoped and global subscriptions
//! - `LogListener` (feature `logging`) tracing output for every event

#[cfg(feature = "logging")]
mod log;
mod listener;
mod registry;

#[cfg(feature = "logging")]
pub use log::LogListener;
pub use listener::TaskListener;
pub use registry::{ListenerRef, ListenerRegistry};
