//! # Closure-backed tasks (`TaskFn`, `CallFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(TaskContext) -> Fut` returning
//! `Result<(), TaskError>`; [`CallFn`] does the same for closures returning a
//! value. The closure *creates* the future, so captured state stays with the
//! task and nothing is shared unless the caller puts it behind an `Arc`.
//!
//! ## Example
//! ```rust
//! use taskgate::{CallFn, CallRef, TaskContext, TaskError, TaskFn, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc("worker", |ctx: TaskContext| async move {
//!     if ctx.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     Ok(())
//! });
//! assert_eq!(t.name(), "worker");
//!
//! let c: CallRef<u32> = CallFn::arc("answer", |_ctx: TaskContext| async {
//!     Ok::<u32, TaskError>(42)
//! });
//! assert_eq!(c.name(), "answer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::TaskContext;
use crate::tasks::task::{ReturnValueTask, Task};

/// Function-backed fire-and-forget task.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: TaskContext) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

/// Function-backed value-producing task.
#[derive(Debug)]
pub struct CallFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CallFn<F> {
    /// Creates a new function-backed value task.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut, T> ReturnValueTask for CallFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: TaskContext) -> Result<T, TaskError> {
        (self.f)(ctx).await
    }
}
