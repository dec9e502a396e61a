//! # Task execution wrapper.
//!
//! Runs one admitted task from slot acquisition to its `Closed` state and
//! publishes lifecycle events to the [`Bus`].
//!
//! ## Flow
//! ```text
//! Submitted ─► acquire slot (cancellable) ─► Running ─► body (catch panic, timeout, cancel)
//!                    │                                        │
//!                    └── cancelled ──────────┐      Ok ───────┼── Err
//!                                            ▼      ▼         ▼
//!                                         (skip) Succeeded  Failed / (cancelled)
//!                                            │      │         │
//!                                            └──────┴─► seal handlers
//!                                                       ├─► failure-observers (on Err)
//!                                                       ├─► close-observers (always)
//!                                                       ├─► Closed, publish TaskClosed
//!                                                       └─► leave registry, return outcome
//! ```
//!
//! ## Rules
//! - Publishes exactly one of `TaskSucceeded` / `TaskFailed`, then `TaskClosed`.
//! - A cancelled task skips `Succeeded`/`Failed` and goes straight to `Closed`,
//!   but its failure-observers still see [`TaskError::Canceled`].
//! - A body that is already complete when cancellation arrives keeps its own
//!   outcome; only a pending body is dropped and reported as cancelled.
//! - The concurrency slot is released before handlers run.
//! - The outcome is returned only after every handler fired, so a value is
//!   never delivered to its `ResultHandle` before the task is terminal.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tracing::{debug, trace, warn};

use crate::core::handle::TaskControl;
use crate::core::registry::InFlight;
use crate::core::state::TaskState;
use crate::error::{TaskError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::{DispatchSite, notify_closed, notify_failed};

/// Everything the wrapper needs besides the body itself.
pub(crate) struct RunParams {
    pub(crate) control: Arc<TaskControl>,
    pub(crate) slot: InFlight,
    pub(crate) timeout: Option<Duration>,
    pub(crate) semaphore: Option<Arc<Semaphore>>,
    pub(crate) bus: Bus,
}

/// Drives `body` through the full task lifecycle and returns its outcome.
pub(crate) async fn execute<T, F>(params: RunParams, body: F) -> Result<T, TaskError>
where
    F: Future<Output = Result<T, TaskError>> + Send,
{
    let RunParams {
        control,
        slot,
        timeout,
        semaphore,
        bus,
    } = params;

    let outcome = match acquire_slot(&control, semaphore).await {
        Some(permit) => {
            control.set_state(TaskState::Running);
            debug!(task = %control.name, id = %control.id, "task starting");
            bus.publish(
                Event::new(EventKind::TaskStarting)
                    .with_task(Arc::clone(&control.name))
                    .with_id(control.id),
            );

            let res = run_body(&control, body, timeout).await;
            drop(permit);
            res
        }
        None => Err(TaskError::Canceled),
    };

    report_outcome(&control, &outcome, &bus);
    dispatch(&control, outcome.as_ref().err(), &bus);

    control.set_state(TaskState::Closed);
    bus.publish(
        Event::new(EventKind::TaskClosed)
            .with_task(Arc::clone(&control.name))
            .with_id(control.id),
    );
    drop(slot);
    outcome
}

/// A held concurrency slot; `None` when the manager is unbounded.
type Slot = Option<OwnedSemaphorePermit>;

/// Waits for a concurrency slot; `None` if the task was cancelled first.
async fn acquire_slot(control: &TaskControl, semaphore: Option<Arc<Semaphore>>) -> Option<Slot> {
    if control.cancel.is_cancelled() {
        return None;
    }
    let Some(sem) = semaphore else {
        return Some(None);
    };
    tokio::select! {
        biased;
        _ = control.cancel.cancelled() => None,
        // A closed semaphore means the manager gave up on this task.
        permit = sem.acquire_owned() => permit.ok().map(Some),
    }
}

/// Runs the body with panic capture, optional timeout and cancellation.
async fn run_body<T, F>(
    control: &TaskControl,
    body: F,
    timeout: Option<Duration>,
) -> Result<T, TaskError>
where
    F: Future<Output = Result<T, TaskError>> + Send,
{
    let guarded = async {
        let caught = AssertUnwindSafe(body).catch_unwind();
        let res = match timeout.filter(|d| *d > Duration::ZERO) {
            Some(dur) => match time::timeout(dur, caught).await {
                Ok(res) => res,
                Err(_elapsed) => return Err(TaskError::Timeout { timeout: dur }),
            },
            None => caught.await,
        };
        res.unwrap_or_else(|payload| {
            Err(TaskError::Panicked {
                info: panic_info(payload.as_ref()),
            })
        })
    };

    // Body first: an outcome produced in the same poll as the cancellation is kept.
    tokio::select! {
        biased;
        res = guarded => res,
        _ = control.cancel.cancelled() => Err(TaskError::Canceled),
    }
}

/// Moves the task to `Succeeded`/`Failed`, logs and publishes the outcome.
fn report_outcome<T>(control: &TaskControl, outcome: &Result<T, TaskError>, bus: &Bus) {
    match outcome {
        Ok(_) => {
            control.set_state(TaskState::Succeeded);
            trace!(task = %control.name, id = %control.id, "task succeeded");
            bus.publish(
                Event::new(EventKind::TaskSucceeded)
                    .with_task(Arc::clone(&control.name))
                    .with_id(control.id),
            );
        }
        Err(err) => {
            if !err.is_cancellation() {
                control.set_state(TaskState::Failed);
            }
            warn!(task = %control.name, id = %control.id, error = %err, "task failed");
            let mut ev = Event::new(EventKind::TaskFailed)
                .with_task(Arc::clone(&control.name))
                .with_id(control.id)
                .with_reason(err.as_label());
            if let TaskError::Timeout { timeout } = err {
                ev = ev.with_timeout(*timeout);
            }
            bus.publish(ev);
        }
    }
}

/// Seals the handler set and fires failure-observers (on error), then close-observers.
fn dispatch(control: &TaskControl, failure: Option<&TaskError>, bus: &Bus) {
    let handlers = control.handlers.seal();
    let site = DispatchSite {
        id: control.id,
        task: &control.name,
        bus,
    };
    if let Some(err) = failure {
        notify_failed(&handlers.failed, err, &site);
    }
    notify_closed(&handlers.closed, &site);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::handlers::Handlers;
    use crate::tasks::TaskId;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    fn params(handlers: Handlers, timeout: Option<Duration>) -> (RunParams, Arc<Registry>) {
        let registry = Registry::new();
        let id = TaskId::next();
        let cancel = CancellationToken::new();
        let slot = registry
            .admit(id, Arc::from("unit"), cancel.clone(), |_| Ok(()))
            .expect("admitted");
        let control = Arc::new(TaskControl::new(id, Arc::from("unit"), cancel, handlers));
        let params = RunParams {
            control,
            slot,
            timeout,
            semaphore: None,
            bus: Bus::new(64),
        };
        (params, registry)
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>) -> Handlers {
        let (a, b) = (Arc::clone(log), Arc::clone(log));
        let mut handlers = Handlers::default();
        handlers.failed.push(Arc::new(move |e: &TaskError| {
            a.lock().push(format!("failed:{}", e.as_label()))
        }));
        handlers
            .closed
            .push(Arc::new(move || b.lock().push("closed".to_string())));
        handlers
    }

    #[tokio::test]
    async fn success_fires_only_close_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, registry) = params(recording(&log), None);
        let control = Arc::clone(&params.control);

        let res = execute(params, async { Ok::<_, TaskError>(11) }).await;
        assert_eq!(res, Ok(11));
        assert_eq!(*log.lock(), vec!["closed"]);
        assert_eq!(control.state(), TaskState::Closed);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn failure_fires_failure_handlers_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), None);

        let res = execute(params, async { Err::<(), _>(TaskError::fail("boom")) }).await;
        assert_eq!(res, Err(TaskError::fail("boom")));
        assert_eq!(*log.lock(), vec!["failed:task_failed", "closed"]);
    }

    #[tokio::test]
    async fn panic_becomes_task_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), None);

        let res: Result<(), TaskError> = execute(params, async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        })
        .await;
        assert_eq!(
            res,
            Err(TaskError::Panicked {
                info: "kaboom".into()
            })
        );
        assert_eq!(*log.lock(), vec!["failed:task_panicked", "closed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_drops_body() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), Some(Duration::from_millis(50)));

        let res = execute(params, async {
            time::sleep(Duration::from_secs(60)).await;
            Ok::<_, TaskError>(())
        })
        .await;
        assert_eq!(
            res,
            Err(TaskError::Timeout {
                timeout: Duration::from_millis(50)
            })
        );
        assert_eq!(*log.lock(), vec!["failed:task_timeout", "closed"]);
    }

    #[tokio::test]
    async fn value_ready_with_cancellation_is_kept() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), None);
        let control = Arc::clone(&params.control);
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

        let run = tokio::spawn(execute(params, async move {
            rx.await.map_err(|_| TaskError::fail("sender dropped"))
        }));
        while control.state() != TaskState::Running {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        tx.send(7).expect("send");
        control.cancel.cancel();

        assert_eq!(run.await.expect("join"), Ok(7));
        assert_eq!(*log.lock(), vec!["closed"]);
    }

    #[tokio::test]
    async fn pending_body_is_dropped_on_cancel() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), None);
        let control = Arc::clone(&params.control);

        let run = tokio::spawn(execute(params, async {
            std::future::pending::<Result<(), TaskError>>().await
        }));
        while control.state() != TaskState::Running {
            tokio::task::yield_now().await;
        }
        control.cancel.cancel();

        assert_eq!(run.await.expect("join"), Err(TaskError::Canceled));
        assert_eq!(*log.lock(), vec!["failed:task_canceled", "closed"]);
        assert_eq!(control.state(), TaskState::Closed);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_runs_body() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (params, _registry) = params(recording(&log), None);
        params.control.cancel.cancel();
        let control = Arc::clone(&params.control);
        let ran = Arc::new(Mutex::new(false));

        let res = execute(params, {
            let ran = Arc::clone(&ran);
            async move {
                *ran.lock() = true;
                Ok::<(), TaskError>(())
            }
        })
        .await;
        assert_eq!(res, Err(TaskError::Canceled));
        assert!(!*ran.lock());
        assert_eq!(*log.lock(), vec!["failed:task_canceled", "closed"]);
        assert_eq!(control.state(), TaskState::Closed);
    }
}
