//! Error types used by the task manager and by tasks.
//!
//! This module defines four error enums:
//!
//! - [`SubmitError`]: admission errors returned synchronously by `submit`.
//! - [`TaskError`]: failures of individual task bodies.
//! - [`RegisterError`]: handler registration on a task that already closed.
//! - [`RuntimeError`]: errors raised by the manager itself (build, shutdown).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;
use thiserror::Error;

/// # Admission errors.
///
/// Returned synchronously by [`TaskManager::submit`](crate::TaskManager::submit)
/// and [`TaskManager::submit_value`](crate::TaskManager::submit_value). A rejected
/// task is never run and none of its handlers fire.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The manager is closing or closed. Not retryable against the same manager.
    #[error("task manager has been closed")]
    Closed,

    /// The number of admitted-but-unfinished tasks reached `Config::max_pending`.
    #[error("task manager is full ({capacity} tasks pending)")]
    Full {
        /// The configured pending limit.
        capacity: usize,
    },
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskgate::SubmitError;
    ///
    /// assert_eq!(SubmitError::Closed.as_label(), "submit_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::Closed => "submit_closed",
            SubmitError::Full { .. } => "submit_full",
        }
    }

    /// Returns `true` if the same submission may succeed later on the same manager.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Full { .. })
    }
}

/// # Errors produced by task execution.
///
/// Every failure of a task body ends up here: an explicit error return, a panic,
/// a timeout, or a cancellation requested by `close()`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The body returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The body exceeded its timeout and was dropped.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The body panicked.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The task was cancelled by its handle or by a cancelling shutdown.
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskgate::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }

    /// Tells a cancellation apart from a failure raised by the body itself.
    ///
    /// # Example
    /// ```
    /// use taskgate::TaskError;
    ///
    /// assert!(TaskError::Canceled.is_cancellation());
    /// assert!(!TaskError::fail("boom").is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// Handler registration was refused.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Terminal dispatch for the task already started; the handler would never fire.
    #[error("task '{task}' is already closed")]
    TaskClosed {
        /// Name of the task.
        task: String,
    },
}

/// # Errors produced by the manager itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The builder was not given a runtime handle and no tokio runtime was current.
    #[error("no tokio runtime available to build the task manager")]
    NoRuntime,

    /// Draining exceeded the grace period; the remaining tasks were cancelled.
    #[error("shutdown grace {grace:?} exceeded; cancelled: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that were still running and got cancelled.
        stuck: Vec<String>,
    },

    /// The spawned shutdown sequence panicked or its runtime shut down first.
    #[error("shutdown sequence aborted before the manager closed")]
    CloseAborted,

    /// Listening for OS termination signals failed.
    #[error("failed to listen for shutdown signals: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskgate::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoRuntime => "runtime_missing",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::CloseAborted => "runtime_close_aborted",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::NoRuntime => "no tokio runtime".to_string(),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
            RuntimeError::CloseAborted => "shutdown sequence aborted".to_string(),
            RuntimeError::Signal(e) => format!("signal listener: {e}"),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
