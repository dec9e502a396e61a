//! # Events emitted by the task manager and the execution wrapper.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Admission events**: a task was admitted or rejected by the gate
//! - **Task lifecycle events**: starting, succeeded, failed, closed
//! - **Shutdown events**: close requested, drain outcome, manager closed
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task
//! name and id, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskgate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("import-rooms")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("import-rooms"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Admission events ===
    /// Task passed the admission gate and was handed to the worker pool.
    ///
    /// Sets: `task`, `task_id`
    TaskSubmitted,

    /// Submission was refused (manager closing/closed or full).
    ///
    /// Sets: `task`, `reason` (error label)
    TaskRejected,

    // === Task lifecycle events ===
    /// Task body is about to run (a concurrency slot was acquired).
    ///
    /// Sets: `task`, `task_id`
    TaskStarting,

    /// Task body returned successfully.
    ///
    /// Sets: `task`, `task_id`
    TaskSucceeded,

    /// Task body failed, timed out, panicked or was cancelled.
    ///
    /// Sets: `task`, `task_id`, `reason`, `timeout_ms` (on timeout)
    TaskFailed,

    /// All handlers of the task fired; the task is terminal.
    ///
    /// Sets: `task`, `task_id`
    TaskClosed,

    /// A close- or failure-observer panicked; dispatch continued.
    ///
    /// Sets: `task`, `task_id`, `reason` (handler name and panic info)
    HandlerPanicked,

    // === Shutdown events ===
    /// `close()` began; the manager stopped admitting work.
    ShutdownRequested,

    /// Every in-flight task reached a terminal state within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; the remaining tasks were cancelled.
    ///
    /// Sets: `reason` (stuck task names)
    GraceExceeded,

    /// The manager reached its final `Closed` state.
    ManagerClosed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Id of the task, if applicable.
    pub task_id: Option<TaskId>,
    /// Human-readable reason (errors, rejection labels, etc.).
    pub reason: Option<Arc<str>>,
    /// Task timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a handler panic event.
    #[inline]
    pub fn handler_panicked(task: &str, id: TaskId, handler: &str, info: &str) -> Self {
        Event::new(EventKind::HandlerPanicked)
            .with_task(task)
            .with_id(id)
            .with_reason(format!("handler={handler} info={info}"))
    }

    /// True for events that describe a single task.
    #[inline]
    pub fn is_task_event(&self) -> bool {
        self.task_id.is_some()
    }
}
