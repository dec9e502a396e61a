//! # Task abstractions and specifications.
//!
//! This module provides the task-related types:
//! - [`Task`] / [`ReturnValueTask`] traits for fire-and-forget and value-producing work
//! - [`TaskFn`] / [`CallFn`] closure-backed implementations
//! - [`TaskRef`] / [`CallRef`] shared references (`Arc<dyn ...>`)
//! - [`TaskSpec`] work bundled with pre-registered handlers and a timeout
//! - [`TaskContext`] what a running body sees (id, name, cancellation, parent manager)
//! - [`TaskId`] process-unique identity

mod context;
mod id;
mod spec;
mod task;
mod task_fn;

pub use context::TaskContext;
pub use id::TaskId;
pub use spec::TaskSpec;
pub use task::{CallRef, ReturnValueTask, Task, TaskRef};
pub use task_fn::{CallFn, TaskFn};
