//! # Task specification for submission.
//!
//! Defines [`TaskSpec`] a bundle of the work to run, the handlers registered
//! before submission, and an optional per-task timeout.
//!
//! A spec can be created:
//! - **Fire-and-forget** with [`TaskSpec::new`]
//! - **Value-producing** with [`TaskSpec::value`]
//! - **Implicitly** from an `Arc` of any [`Task`] / [`ReturnValueTask`] (via `From`)
//!
//! ## Rules
//! - Handlers fire in the order they were added, spec handlers first, then the
//!   ones added on the handle after submission.
//! - A spec that is dropped without being submitted (or that was rejected)
//!   never fires any handler.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::handlers::{CloseHandler, FailureHandler, Handlers, Labeled};
use crate::tasks::task::{CallRef, ReturnValueTask, Task, TaskRef};

/// Work plus pre-registered handlers, ready for submission.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskgate::{TaskContext, TaskError, TaskFn, TaskSpec};
///
/// let spec = TaskSpec::new(TaskFn::arc("dump", |_ctx: TaskContext| async {
///     Ok::<(), TaskError>(())
/// }))
/// .on_failed(|e: &TaskError| eprintln!("dump failed: {e}"))
/// .on_closed(|| println!("dump closed"))
/// .with_timeout(Some(Duration::from_secs(30)));
///
/// assert_eq!(spec.name(), "dump");
/// assert_eq!(spec.handler_count(), 2);
/// ```
pub struct TaskSpec<W: ?Sized> {
    work: Arc<W>,
    handlers: Handlers,
    timeout: Option<Duration>,
}

impl TaskSpec<dyn Task> {
    /// Creates a spec for fire-and-forget work.
    pub fn new(task: TaskRef) -> Self {
        Self::from_work(task)
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        self.work.name()
    }
}

impl<T: Send + 'static> TaskSpec<dyn ReturnValueTask<Output = T>> {
    /// Creates a spec for value-producing work.
    pub fn value(call: CallRef<T>) -> Self {
        Self::from_work(call)
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        self.work.name()
    }
}

impl<W: ?Sized> TaskSpec<W> {
    fn from_work(work: Arc<W>) -> Self {
        Self {
            work,
            handlers: Handlers::default(),
            timeout: None,
        }
    }

    /// Adds a close-observer and returns the spec.
    pub fn on_closed(mut self, handler: impl CloseHandler) -> Self {
        self.handlers.closed.push(Arc::new(handler));
        self
    }

    /// Adds a failure-observer and returns the spec.
    pub fn on_failed(mut self, handler: impl FailureHandler) -> Self {
        self.handlers.failed.push(Arc::new(handler));
        self
    }

    /// Adds a close-observer reported as `label` in logs and events.
    pub fn on_closed_as(
        mut self,
        label: impl Into<Cow<'static, str>>,
        handler: impl CloseHandler,
    ) -> Self {
        self.handlers.closed.push(Arc::new(Labeled::new(label, handler)));
        self
    }

    /// Adds a failure-observer reported as `label` in logs and events.
    pub fn on_failed_as(
        mut self,
        label: impl Into<Cow<'static, str>>,
        handler: impl FailureHandler,
    ) -> Self {
        self.handlers.failed.push(Arc::new(Labeled::new(label, handler)));
        self
    }

    /// Adds a shared close-observer.
    pub fn add_closed_handler(&mut self, handler: Arc<dyn CloseHandler>) {
        self.handlers.closed.push(handler);
    }

    /// Adds a shared failure-observer.
    pub fn add_failed_handler(&mut self, handler: Arc<dyn FailureHandler>) {
        self.handlers.failed.push(handler);
    }

    /// Returns a new spec with updated timeout (`None` = inherit the manager default).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of handlers registered so far.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Returns reference to the work.
    pub fn work(&self) -> &Arc<W> {
        &self.work
    }

    pub(crate) fn into_parts(self) -> (Arc<W>, Handlers, Option<Duration>) {
        (self.work, self.handlers, self.timeout)
    }
}

impl From<TaskRef> for TaskSpec<dyn Task> {
    fn from(task: TaskRef) -> Self {
        TaskSpec::new(task)
    }
}

impl<W: Task> From<Arc<W>> for TaskSpec<dyn Task> {
    fn from(task: Arc<W>) -> Self {
        TaskSpec::new(task)
    }
}

impl<T: Send + 'static> From<CallRef<T>> for TaskSpec<dyn ReturnValueTask<Output = T>> {
    fn from(call: CallRef<T>) -> Self {
        TaskSpec::value(call)
    }
}

impl<W> From<Arc<W>> for TaskSpec<dyn ReturnValueTask<Output = W::Output>>
where
    W: ReturnValueTask,
{
    fn from(call: Arc<W>) -> Self {
        TaskSpec::value(call)
    }
}
