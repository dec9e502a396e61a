//! # Task abstractions.
//!
//! Two capability variants share one execution wrapper:
//! - [`Task`]: fire-and-forget work, succeeds or fails;
//! - [`ReturnValueTask`]: value-producing work, yields `Output` or fails.
//!
//! Both receive a [`TaskContext`] and should watch its cancellation token so
//! that `close()` and cancelling shutdowns stop them promptly. A body that never
//! yields cannot be interrupted.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::TaskContext;

/// # Fire-and-forget unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskgate::{Task, TaskContext, TaskError};
///
/// struct Integrate;
///
/// #[async_trait]
/// impl Task for Integrate {
///     fn name(&self) -> &str { "integrate" }
///
///     async fn run(&self, ctx: TaskContext) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the body once.
    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError>;
}

/// # Value-producing unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskgate::{ReturnValueTask, TaskContext, TaskError};
///
/// struct CountRooms;
///
/// #[async_trait]
/// impl ReturnValueTask for CountRooms {
///     type Output = usize;
///
///     fn name(&self) -> &str { "count-rooms" }
///
///     async fn call(&self, _ctx: TaskContext) -> Result<usize, TaskError> {
///         Ok(42)
///     }
/// }
/// ```
#[async_trait]
pub trait ReturnValueTask: Send + Sync + 'static {
    /// Value produced on success.
    type Output: Send + 'static;

    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the body once and produces its value.
    async fn call(&self, ctx: TaskContext) -> Result<Self::Output, TaskError>;
}

/// Shared handle to a fire-and-forget task.
pub type TaskRef = Arc<dyn Task>;

/// Shared handle to a value-producing task.
pub type CallRef<T> = Arc<dyn ReturnValueTask<Output = T>>;
