//! # Observer traits
//!
//! [`CloseHandler`] and [`FailureHandler`] are the extension points for reacting
//! to a task's terminal outcome. Closures implement them directly:
//!
//! ```rust
//! use taskgate::{CloseHandler, FailureHandler, TaskError};
//!
//! let on_closed = || println!("closed");
//! let on_failed = |e: &TaskError| eprintln!("failed: {e}");
//!
//! on_closed.on_closed();
//! on_failed.on_failed(&TaskError::fail("boom"));
//! ```
//!
//! ## Contract
//! - Called from the worker that ran the task, right after the body finished.
//!   Keep them short; they delay the task's `Closed` transition.
//! - A panic inside a handler is caught and logged; the remaining handlers
//!   still run.
//! - Closures report the name `"closure"`; register them with a label
//!   (`on_closed_as`, `on_failed_as`) to tell them apart in logs and events.

use std::borrow::Cow;

use crate::error::TaskError;

/// Notified exactly once when a task reaches a terminal state.
pub trait CloseHandler: Send + Sync + 'static {
    /// Called once, after any failure handlers.
    fn on_closed(&self);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Notified when a task's body fails, before any close handler.
pub trait FailureHandler: Send + Sync + 'static {
    /// Called once with the failure.
    fn on_failed(&self, error: &TaskError);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> CloseHandler for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn on_closed(&self) {
        self()
    }

    fn name(&self) -> &str {
        "closure"
    }
}

impl<F> FailureHandler for F
where
    F: Fn(&TaskError) + Send + Sync + 'static,
{
    fn on_failed(&self, error: &TaskError) {
        self(error)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// A handler reported under a caller-chosen name.
pub(crate) struct Labeled<H> {
    label: Cow<'static, str>,
    inner: H,
}

impl<H> Labeled<H> {
    pub(crate) fn new(label: impl Into<Cow<'static, str>>, inner: H) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }
}

impl<H: CloseHandler> CloseHandler for Labeled<H> {
    fn on_closed(&self) {
        self.inner.on_closed()
    }

    fn name(&self) -> &str {
        &self.label
    }
}

impl<H: FailureHandler> FailureHandler for Labeled<H> {
    fn on_failed(&self, error: &TaskError) {
        self.inner.on_failed(error)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_and_labels_have_short_names() {
        let plain = || {};
        assert_eq!(CloseHandler::name(&plain), "closure");

        let audit = Labeled::new("audit", |_: &TaskError| {});
        assert_eq!(FailureHandler::name(&audit), "audit");
    }
}
