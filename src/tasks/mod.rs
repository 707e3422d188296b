//! # Task entities, storage port and adapters.
//!
//! - [`TaskAdapter`] capability interface the core works through
//! - [`TaskClass`]   runtime descriptor of a concrete entity type
//! - [`TaskStore`]   storage port (external collaborator)
//! - [`MemoryStore`] in-memory storage port
//! - [`TaskRecord`] / [`RecordAdapter`] reference entity and its adapter

mod adapter;
mod record;
mod store;

pub use adapter::{RecordAdapter, TaskAdapter, TaskClass};
pub use record::TaskRecord;
pub use store::{MemoryStore, StoreRecord, TaskStore};
