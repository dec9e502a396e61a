//! # Handles returned by submission.
//!
//! - [`TaskHandle`]: identity, state, late handler registration, `close()`.
//! - [`ResultHandle`]: a [`TaskHandle`] plus the write-once result slot of a
//!   value-producing task.
//!
//! Both share the per-task [`TaskControl`] with the execution wrapper.

use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::core::state::TaskState;
use crate::error::{RegisterError, TaskError};
use crate::handlers::{CloseHandler, FailureHandler, HandlerSet, Handlers, Labeled};
use crate::tasks::TaskId;

/// Control block shared by a task's handles and its execution wrapper.
pub(crate) struct TaskControl {
    pub(crate) id: TaskId,
    pub(crate) name: Arc<str>,
    pub(crate) handlers: HandlerSet,
    pub(crate) cancel: CancellationToken,
    state: watch::Sender<TaskState>,
}

impl TaskControl {
    pub(crate) fn new(
        id: TaskId,
        name: Arc<str>,
        cancel: CancellationToken,
        handlers: Handlers,
    ) -> Self {
        let (state, _rx) = watch::channel(TaskState::Created);
        Self {
            id,
            handlers: HandlerSet::new(Arc::clone(&name), handlers),
            name,
            cancel,
            state,
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, next: TaskState) {
        self.state.send_replace(next);
    }
}

/// Handle to a submitted task.
///
/// Cheap to clone; all clones refer to the same task.
#[derive(Clone)]
pub struct TaskHandle {
    control: Arc<TaskControl>,
}

impl TaskHandle {
    pub(crate) fn new(control: Arc<TaskControl>) -> Self {
        Self { control }
    }

    /// Process-unique task id.
    pub fn id(&self) -> TaskId {
        self.control.id
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.control.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    /// True once every handler fired.
    pub fn is_closed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Registers a close-observer.
    ///
    /// Fails with [`RegisterError::TaskClosed`] once terminal dispatch has begun.
    pub fn on_closed(&self, handler: impl CloseHandler) -> Result<(), RegisterError> {
        self.add_closed_handler(Arc::new(handler))
    }

    /// Registers a failure-observer.
    ///
    /// Fails with [`RegisterError::TaskClosed`] once terminal dispatch has begun.
    pub fn on_failed(&self, handler: impl FailureHandler) -> Result<(), RegisterError> {
        self.add_failed_handler(Arc::new(handler))
    }

    /// Registers a close-observer reported as `label` in logs and events.
    pub fn on_closed_as(
        &self,
        label: impl Into<Cow<'static, str>>,
        handler: impl CloseHandler,
    ) -> Result<(), RegisterError> {
        self.add_closed_handler(Arc::new(Labeled::new(label, handler)))
    }

    /// Registers a failure-observer reported as `label` in logs and events.
    pub fn on_failed_as(
        &self,
        label: impl Into<Cow<'static, str>>,
        handler: impl FailureHandler,
    ) -> Result<(), RegisterError> {
        self.add_failed_handler(Arc::new(Labeled::new(label, handler)))
    }

    /// Registers a shared close-observer.
    pub fn add_closed_handler(&self, handler: Arc<dyn CloseHandler>) -> Result<(), RegisterError> {
        self.control.handlers.add_closed(handler)
    }

    /// Registers a shared failure-observer.
    pub fn add_failed_handler(
        &self,
        handler: Arc<dyn FailureHandler>,
    ) -> Result<(), RegisterError> {
        self.control.handlers.add_failed(handler)
    }

    /// Requests cancellation. Idempotent.
    ///
    /// A task still waiting for a slot never runs; a running body is dropped at
    /// its next await point. Either way failure-observers receive
    /// [`TaskError::Canceled`] and close-observers fire once. A task that
    /// already finished is unaffected, and so is a body whose outcome is ready
    /// in the same poll the cancellation is seen. Bodies that watch
    /// [`TaskContext::cancelled`](crate::TaskContext::cancelled) report their
    /// own outcome, usually `Err(TaskError::Canceled)`.
    pub fn close(&self) {
        self.control.cancel.cancel();
    }

    /// Completes once the task reached [`TaskState::Closed`].
    pub async fn closed(&self) {
        let mut rx = self.control.state.subscribe();
        // The sender lives in `control`, which this handle keeps alive.
        let _ = rx.wait_for(TaskState::is_terminal).await;
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.control.id)
            .field("name", &self.control.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Handle to a submitted value-producing task.
///
/// The result is delivered after every handler of the task fired, so once
/// [`join`](Self::join) returns the observers have already seen the outcome.
pub struct ResultHandle<T> {
    handle: TaskHandle,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(handle: TaskHandle, rx: oneshot::Receiver<Result<T, TaskError>>) -> Self {
        Self { handle, rx }
    }

    /// The underlying task handle.
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    /// Waits for the task to finish and returns its value or failure.
    pub async fn join(self) -> Result<T, TaskError> {
        self.rx.await.unwrap_or(Err(TaskError::Canceled))
    }

    /// Returns the outcome if the task already finished, or the handle back otherwise.
    pub fn try_join(mut self) -> Result<Result<T, TaskError>, Self> {
        match self.rx.try_recv() {
            Ok(res) => Ok(res),
            Err(oneshot::error::TryRecvError::Empty) => Err(self),
            Err(oneshot::error::TryRecvError::Closed) => Ok(Err(TaskError::Canceled)),
        }
    }

    /// Blocks the current thread until the task finishes.
    ///
    /// # Panics
    /// Panics when called from within an asynchronous execution context, like
    /// [`oneshot::Receiver::blocking_recv`].
    pub fn blocking_join(self) -> Result<T, TaskError> {
        self.rx.blocking_recv().unwrap_or(Err(TaskError::Canceled))
    }

    /// Requests cancellation, see [`TaskHandle::close`].
    pub fn close(&self) {
        self.handle.close();
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
