//! # Task manager configuration.
//!
//! Provides [`Config`] centralized settings for a [`TaskManager`](crate::TaskManager)
//! and [`ShutdownMode`] which decides what `close()` does with in-flight work.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unbounded (no semaphore created)
//! - `max_pending = 0` → no admission limit
//! - `grace = 0s` → drain waits indefinitely
//! - `timeout = 0s` → no default per-task timeout

use std::time::Duration;

/// What `close()` does with tasks that are still in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Let every admitted task run to its terminal state.
    #[default]
    Drain,
    /// Cancel every in-flight task; bodies observe [`TaskError::Canceled`](crate::TaskError::Canceled).
    Cancel,
}

impl ShutdownMode {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownMode::Drain => "drain",
            ShutdownMode::Cancel => "cancel",
        }
    }
}

/// Configuration for a task manager.
///
/// ## Field semantics
/// - `max_concurrent`: bodies running at the same time (`0` = unbounded, `1` = single-threaded)
/// - `max_pending`: admitted-but-unfinished tasks (`0` = unbounded)
/// - `shutdown`: default mode for `close()`
/// - `grace`: drain budget before escalating to cancel (`0s` = wait forever)
/// - `timeout`: default per-task timeout (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskgate::{Config, ShutdownMode};
///
/// let mut cfg = Config::fixed(4);
/// cfg.shutdown = ShutdownMode::Cancel;
/// cfg.grace = Duration::from_secs(5);
///
/// assert_eq!(cfg.concurrency_limit(), Some(4));
/// assert_eq!(cfg.grace_period(), Some(Duration::from_secs(5)));
/// assert_eq!(cfg.default_timeout(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of task bodies running simultaneously.
    ///
    /// - `0` = unbounded (no semaphore)
    /// - `1` = single-threaded execution, tasks run one at a time in admission order
    /// - `n > 1` = fixed pool of `n` slots
    pub max_concurrent: usize,

    /// Maximum number of admitted tasks that have not reached `Closed` yet.
    ///
    /// Submissions beyond this limit fail with [`SubmitError::Full`](crate::SubmitError::Full).
    pub max_pending: usize,

    /// Default shutdown mode used by `close()`.
    pub shutdown: ShutdownMode,

    /// Maximum time `close()` waits for draining before cancelling the rest.
    ///
    /// When exceeded, the stuck tasks are cancelled and `close()` returns
    /// [`RuntimeError::GraceExceeded`](crate::RuntimeError::GraceExceeded).
    pub grace: Duration,

    /// Default task timeout; can be overridden per task.
    pub timeout: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages get
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// No concurrency limit: every admitted task runs immediately.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Fixed pool: at most `n` bodies run at once (`0` behaves like [`Config::unbounded`]).
    pub fn fixed(n: usize) -> Self {
        Self {
            max_concurrent: n,
            ..Self::default()
        }
    }

    /// One body at a time.
    pub fn single_threaded() -> Self {
        Self::fixed(1)
    }

    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` concurrent bodies
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the admission limit as an `Option`.
    #[inline]
    pub fn pending_limit(&self) -> Option<usize> {
        if self.max_pending == 0 {
            None
        } else {
            Some(self.max_pending)
        }
    }

    /// Returns the drain grace period (`None` = wait indefinitely).
    #[inline]
    pub fn grace_period(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns the default per-task timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (unbounded)
    /// - `max_pending = 0` (unbounded)
    /// - `shutdown = ShutdownMode::Drain`
    /// - `grace = 0s` (drain waits for every task)
    /// - `timeout = 0s` (no timeout)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            max_pending: 0,
            shutdown: ShutdownMode::Drain,
            grace: Duration::ZERO,
            timeout: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
