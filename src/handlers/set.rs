//! # HandlerSet: per-task ordered observer registry
//!
//! Holds the close- and failure-observers of one task and dispatches them at
//! most once.
//!
//! ## What it guarantees
//! - Handlers fire in registration order.
//! - Failure handlers fire before close handlers.
//! - Each handler fires at most once: [`HandlerSet::seal`] moves the lists out
//!   under the lock, so a second seal gets nothing.
//! - Registration after sealing is rejected with [`RegisterError::TaskClosed`].
//! - Panics inside handlers are caught and logged (isolation).
//!
//! ## Diagram
//! ```text
//!   add_closed/add_failed ──► [lists] ──seal()──► Handlers { failed, closed }
//!                                                      │
//!                          notify_failed(&err) ◄───────┤  (only on failure)
//!                          notify_closed()     ◄───────┘  (always, last)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::error::{RegisterError, TaskError, panic_info};
use crate::events::{Bus, Event};
use crate::handlers::{CloseHandler, FailureHandler};
use crate::tasks::TaskId;

/// Handler lists collected on a [`TaskSpec`](crate::TaskSpec) before submission.
#[derive(Clone, Default)]
pub(crate) struct Handlers {
    pub(crate) closed: Vec<Arc<dyn CloseHandler>>,
    pub(crate) failed: Vec<Arc<dyn FailureHandler>>,
}

impl Handlers {
    pub(crate) fn len(&self) -> usize {
        self.closed.len() + self.failed.len()
    }
}

struct Inner {
    handlers: Handlers,
    sealed: bool,
}

/// Ordered observer registry of one submitted task.
pub(crate) struct HandlerSet {
    task: Arc<str>,
    inner: Mutex<Inner>,
}

impl HandlerSet {
    pub(crate) fn new(task: Arc<str>, handlers: Handlers) -> Self {
        Self {
            task,
            inner: Mutex::new(Inner {
                handlers,
                sealed: false,
            }),
        }
    }

    pub(crate) fn add_closed(&self, h: Arc<dyn CloseHandler>) -> Result<(), RegisterError> {
        let mut inner = self.inner.lock();
        if inner.sealed {
            return Err(self.closed_error());
        }
        inner.handlers.closed.push(h);
        Ok(())
    }

    pub(crate) fn add_failed(&self, h: Arc<dyn FailureHandler>) -> Result<(), RegisterError> {
        let mut inner = self.inner.lock();
        if inner.sealed {
            return Err(self.closed_error());
        }
        inner.handlers.failed.push(h);
        Ok(())
    }

    /// Stops registration and takes the lists for dispatch. Later calls return empty lists.
    pub(crate) fn seal(&self) -> Handlers {
        let mut inner = self.inner.lock();
        inner.sealed = true;
        std::mem::take(&mut inner.handlers)
    }

    #[cfg(test)]
    pub(crate) fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    fn closed_error(&self) -> RegisterError {
        RegisterError::TaskClosed {
            task: self.task.to_string(),
        }
    }
}

/// Where a dispatch happens; used to label logs and events.
pub(crate) struct DispatchSite<'a> {
    pub(crate) id: TaskId,
    pub(crate) task: &'a str,
    pub(crate) bus: &'a Bus,
}

impl DispatchSite<'_> {
    fn report_panic(&self, handler: &str, info: &str) {
        error!(task = %self.task, id = %self.id, handler, info, "task handler panicked");
        self.bus
            .publish(Event::handler_panicked(self.task, self.id, handler, info));
    }
}

/// Invokes every failure handler in order; returns how many panicked.
pub(crate) fn notify_failed(
    handlers: &[Arc<dyn FailureHandler>],
    err: &TaskError,
    site: &DispatchSite<'_>,
) -> usize {
    let mut panicked = 0;
    for h in handlers {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| h.on_failed(err))) {
            panicked += 1;
            site.report_panic(h.name(), &panic_info(payload.as_ref()));
        }
    }
    panicked
}

/// Invokes every close handler in order; returns how many panicked.
pub(crate) fn notify_closed(
    handlers: &[Arc<dyn CloseHandler>],
    site: &DispatchSite<'_>,
) -> usize {
    let mut panicked = 0;
    for h in handlers {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| h.on_closed())) {
            panicked += 1;
            site.report_panic(h.name(), &panic_info(payload.as_ref()));
        }
    }
    panicked
}
