//! # Lifecycle states of the manager and of individual tasks.
//!
//! ```text
//! Manager:  Open ──close()──► Closing ──drained/cancelled──► Closed
//!
//! Task:     Created ─► Submitted ─► Running ─► Succeeded ─┐
//!                          │           │   └─► Failed ────┼─► Closed
//!                          └───────────┴── (cancelled) ───┘
//! ```
//!
//! Both machines only move forward. The manager flag lives in an atomic and
//! changes through compare-and-swap, so concurrent `close()` calls agree on a
//! single winner.

use std::sync::atomic::{AtomicU8, Ordering};

/// Admission state of a [`TaskManager`](crate::TaskManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ManagerState {
    /// Accepting submissions.
    Open = 0,
    /// `close()` started; submissions are rejected, in-flight work is draining or being cancelled.
    Closing = 1,
    /// Every admitted task reached a terminal state (or the grace period ran out).
    Closed = 2,
}

impl ManagerState {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerState::Open => "open",
            ManagerState::Closing => "closing",
            ManagerState::Closed => "closed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ManagerState::Open,
            1 => ManagerState::Closing,
            _ => ManagerState::Closed,
        }
    }
}

/// Atomic holder for [`ManagerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ManagerState::Open as u8))
    }

    pub(crate) fn load(&self) -> ManagerState {
        ManagerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from → to`; returns `false` if the current state is not `from`.
    pub(crate) fn transition(&self, from: ManagerState, to: ManagerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Lifecycle state of a single task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Built but not submitted yet.
    Created,
    /// Admitted; waiting for a concurrency slot.
    Submitted,
    /// Body is executing.
    Running,
    /// Body returned successfully; handlers are being dispatched.
    Succeeded,
    /// Body failed; handlers are being dispatched.
    Failed,
    /// All handlers fired. Terminal.
    Closed,
}

impl TaskState {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Submitted => "submitted",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Closed => "closed",
        }
    }

    /// True once the task will never run again and every handler fired.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Closed)
    }
}
