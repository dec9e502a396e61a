use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::core::{Config, TaskManager};
use crate::error::RuntimeError;

/// Builder for constructing a [`TaskManager`].
pub struct TaskManagerBuilder {
    cfg: Config,
    runtime: Option<Handle>,
}

impl TaskManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg, runtime: None }
    }

    /// Runs tasks on the given runtime instead of the current one.
    ///
    /// Lets a manager be built outside any runtime context, e.g. from `main`
    /// before entering the runtime or from a plain thread.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds and returns the manager.
    ///
    /// Fails with [`RuntimeError::NoRuntime`] when no runtime handle was given
    /// and the caller is not inside a tokio runtime.
    pub fn build(self) -> Result<Arc<TaskManager>, RuntimeError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| RuntimeError::NoRuntime)?,
        };
        debug!(
            max_concurrent = self.cfg.max_concurrent,
            max_pending = self.cfg.max_pending,
            shutdown = self.cfg.shutdown.as_label(),
            "building task manager"
        );
        Ok(TaskManager::new_internal(self.cfg, runtime))
    }
}
