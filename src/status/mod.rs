//! Task status model.
//!
//! ## Contents
//! - [`TaskStatus`] closed lifecycle enumeration and its transition table
//! - [`TaskType`]   open, integer-coded job kind
//!
//! ## Transitions
//! ```text
//! CREATE ──► RUNNING ──► SUCCESS
//!                   └──► FAILURE
//!
//! any ──► DELETE (soft delete)
//! ```
//! Terminal states (`SUCCESS`, `FAILURE`, `DELETE`) never go back to a
//! non-terminal state.

mod task_status;
mod task_type;

pub use task_status::TaskStatus;
pub use task_type::TaskType;
