//! # Per-run task context.
//!
//! Every body receives a [`TaskContext`]: the task's identity, the
//! [`CancellationToken`] that `close()` and a cancelling shutdown trigger, and a
//! weak link to the owning [`TaskManager`] so running work can submit follow-up
//! tasks.

use std::sync::{Arc, Weak};

use tokio_util::sync::CancellationToken;

use crate::core::TaskManager;
use crate::tasks::TaskId;

/// Execution context handed to [`Task::run`](crate::Task::run) and
/// [`ReturnValueTask::call`](crate::ReturnValueTask::call).
#[derive(Clone, Debug)]
pub struct TaskContext {
    id: TaskId,
    name: Arc<str>,
    token: CancellationToken,
    manager: Weak<TaskManager>,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        name: Arc<str>,
        token: CancellationToken,
        manager: Weak<TaskManager>,
    ) -> Self {
        Self {
            id,
            name,
            token,
            manager,
        }
    }

    /// A context bound to no manager, for driving a task body directly.
    ///
    /// ```
    /// use taskgate::TaskContext;
    ///
    /// let ctx = TaskContext::detached("probe");
    /// assert!(ctx.manager().is_none());
    /// assert!(!ctx.is_cancelled());
    /// ```
    pub fn detached(name: &str) -> Self {
        Self::new(
            TaskId::next(),
            Arc::from(name),
            CancellationToken::new(),
            Weak::new(),
        )
    }

    /// Id of the running task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name of the running task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the task was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the task is asked to stop.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The task's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The manager that runs this task, if it is still alive.
    pub fn manager(&self) -> Option<Arc<TaskManager>> {
        self.manager.upgrade()
    }
}
