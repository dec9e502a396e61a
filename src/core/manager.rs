//! # TaskManager: admission gate, worker pool and shutdown protocol.
//!
//! The [`TaskManager`] owns the runtime handle tasks are spawned on, the
//! optional concurrency semaphore, the in-flight registry and the event bus.
//!
//! ## Key responsibilities
//! - admit tasks while `Open`, reject them with [`SubmitError`] otherwise
//! - spawn the execution wrapper for each admitted task
//! - drain or cancel in-flight work on `close()`, bounded by [`Config::grace`]
//! - expose lifecycle queries and an event subscription
//!
//! ## Architecture
//! ```text
//! submit(spec) ──► admit under registry lock ──(state != Open)──► SubmitError::Closed
//!                        │                    ──(pending full)──► SubmitError::Full
//!                        ▼
//!              runtime.spawn(runner::execute(..)) ──► TaskHandle / ResultHandle
//!
//! close_with(mode):
//!   CAS Open → Closing ──(lost)──► wait for the winner, Ok(())
//!        │
//!        └─► runtime.spawn(shutdown(mode)), awaited by the winner
//!        ├─► publish ShutdownRequested
//!        ├─► mode == Cancel ? registry.cancel_all()
//!        ├─► wait until registry empty (up to grace)
//!        │      ├─ drained   → publish AllStoppedWithin
//!        │      └─ exceeded  → cancel the rest, wait for them, Err(GraceExceeded)
//!        ├─► close semaphore
//!        └─► state = Closed, publish ManagerClosed
//! ```
//!
//! ## Example
//! ```rust
//! use taskgate::{Config, TaskContext, TaskError, TaskFn, TaskManager, TaskSpec};
//!
//! #[tokio::main(flavor = "multi_thread", worker_threads = 2)]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TaskManager::new(Config::fixed(2))?;
//!
//!     let spec = TaskSpec::new(TaskFn::arc("index", |_ctx: TaskContext| async {
//!         Ok::<(), TaskError>(())
//!     }))
//!     .on_closed(|| println!("index closed"));
//!     let handle = manager.submit(spec)?;
//!
//!     manager.close().await?;
//!     assert!(handle.is_closed());
//!     assert!(manager.submit(TaskFn::arc("late", |_ctx: TaskContext| async {
//!         Ok::<(), TaskError>(())
//!     })).is_err());
//!     Ok(())
//! }
//! ```

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::builder::TaskManagerBuilder;
use crate::core::config::{Config, ShutdownMode};
use crate::core::handle::{ResultHandle, TaskControl, TaskHandle};
use crate::core::lease::ManagerLease;
use crate::core::registry::Registry;
use crate::core::runner::{self, RunParams};
use crate::core::shutdown;
use crate::core::state::{ManagerState, StateCell, TaskState};
use crate::error::{RuntimeError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::Handlers;
use crate::tasks::{ReturnValueTask, Task, TaskContext, TaskId, TaskSpec};

/// Runs submitted tasks and enforces the open/closing/closed gate.
pub struct TaskManager {
    cfg: Config,
    runtime: Handle,
    state: StateCell,
    registry: Arc<Registry>,
    semaphore: Option<Arc<Semaphore>>,
    bus: Bus,
    /// Cancelled once the manager reached `Closed`.
    closed: CancellationToken,
    pub(crate) leases: AtomicUsize,
    me: Weak<TaskManager>,
}

impl TaskManager {
    /// Returns a builder for a manager with the given configuration.
    pub fn builder(cfg: Config) -> TaskManagerBuilder {
        TaskManagerBuilder::new(cfg)
    }

    /// Builds a manager on the current tokio runtime.
    pub fn new(cfg: Config) -> Result<Arc<Self>, RuntimeError> {
        Self::builder(cfg).build()
    }

    pub(crate) fn new_internal(cfg: Config, runtime: Handle) -> Arc<Self> {
        let semaphore = cfg.concurrency_limit().map(Semaphore::new).map(Arc::new);
        let bus = Bus::new(cfg.bus_capacity_clamped());

        Arc::new_cyclic(|me| Self {
            cfg,
            runtime,
            state: StateCell::new(),
            registry: Registry::new(),
            semaphore,
            bus,
            closed: CancellationToken::new(),
            leases: AtomicUsize::new(0),
            me: me.clone(),
        })
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Admits a fire-and-forget task.
    ///
    /// Never blocks. Fails with [`SubmitError::Closed`] once `close()` has begun
    /// and with [`SubmitError::Full`] when `max_pending` tasks are in flight;
    /// a rejected task never runs and none of its handlers fire.
    pub fn submit(&self, spec: impl Into<TaskSpec<dyn Task>>) -> Result<TaskHandle, SubmitError> {
        let (task, handlers, timeout) = spec.into().into_parts();
        let name: Arc<str> = Arc::from(task.name());

        let (control, params) = self.admit(name, handlers, timeout)?;
        let ctx = self.context(&control);
        self.runtime.spawn(async move {
            let _ = runner::execute(params, async move { task.run(ctx).await }).await;
        });
        Ok(TaskHandle::new(control))
    }

    /// Admits a value-producing task.
    ///
    /// Same admission rules as [`submit`](Self::submit). The returned
    /// [`ResultHandle`] yields the value, or the failure that was also handed
    /// to the failure-observers.
    pub fn submit_value<T: Send + 'static>(
        &self,
        spec: impl Into<TaskSpec<dyn ReturnValueTask<Output = T>>>,
    ) -> Result<ResultHandle<T>, SubmitError> {
        let (call, handlers, timeout) = spec.into().into_parts();
        let name: Arc<str> = Arc::from(call.name());

        let (control, params) = self.admit(name, handlers, timeout)?;
        let ctx = self.context(&control);
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let res = runner::execute(params, async move { call.call(ctx).await }).await;
            let _ = tx.send(res);
        });
        Ok(ResultHandle::new(TaskHandle::new(control), rx))
    }

    /// Checks the gate and registers the task under the registry lock.
    fn admit(
        &self,
        name: Arc<str>,
        handlers: Handlers,
        timeout: Option<Duration>,
    ) -> Result<(Arc<TaskControl>, RunParams), SubmitError> {
        let id = TaskId::next();
        let cancel = CancellationToken::new();
        let pending_limit = self.cfg.pending_limit();

        let admitted = self
            .registry
            .admit(id, Arc::clone(&name), cancel.clone(), |pending| {
                if self.state.load() != ManagerState::Open {
                    return Err(SubmitError::Closed);
                }
                match pending_limit {
                    Some(capacity) if pending >= capacity => Err(SubmitError::Full { capacity }),
                    _ => Ok(()),
                }
            });

        let slot = match admitted {
            Ok(slot) => slot,
            Err(err) => {
                warn!(task = %name, reason = err.as_label(), "submission rejected");
                self.bus.publish(
                    Event::new(EventKind::TaskRejected)
                        .with_task(name)
                        .with_reason(err.as_label()),
                );
                return Err(err);
            }
        };

        let control = Arc::new(TaskControl::new(id, Arc::clone(&name), cancel, handlers));
        control.set_state(TaskState::Submitted);
        debug!(task = %name, %id, "task submitted");
        self.bus
            .publish(Event::new(EventKind::TaskSubmitted).with_task(name).with_id(id));

        let params = RunParams {
            control: Arc::clone(&control),
            slot,
            timeout: timeout.or(self.cfg.default_timeout()),
            semaphore: self.semaphore.clone(),
            bus: self.bus.clone(),
        };
        Ok((control, params))
    }

    fn context(&self, control: &TaskControl) -> TaskContext {
        TaskContext::new(
            control.id,
            Arc::clone(&control.name),
            control.cancel.clone(),
            self.me.clone(),
        )
    }

    /// Closes the manager with the configured [`ShutdownMode`].
    ///
    /// See [`close_with`](Self::close_with).
    pub async fn close(&self) -> Result<(), RuntimeError> {
        self.close_with(self.cfg.shutdown).await
    }

    /// Stops admitting work, then drains or cancels in-flight tasks.
    ///
    /// Idempotent: concurrent and later calls wait until the first one
    /// finishes and return `Ok(())`. The shutdown itself runs on the manager's
    /// runtime, so dropping the returned future (a `timeout`, a lost `select!`)
    /// does not leave the manager stuck in `Closing`. When a grace period is
    /// configured and exceeded, the remaining tasks are cancelled, awaited, and
    /// [`RuntimeError::GraceExceeded`] names them.
    ///
    /// Awaiting this from inside a task body in drain mode without a grace
    /// period never returns, since the drain waits for that body too.
    pub async fn close_with(&self, mode: ShutdownMode) -> Result<(), RuntimeError> {
        if !self.state.transition(ManagerState::Open, ManagerState::Closing) {
            self.closed.cancelled().await;
            return Ok(());
        }

        // Detached from the caller: dropping this future leaves the shutdown running.
        let Some(me) = self.me.upgrade() else {
            return self.shutdown(mode).await;
        };
        match self.runtime.spawn(async move { me.shutdown(mode).await }).await {
            Ok(res) => res,
            Err(join) => {
                error!(error = %join, "shutdown sequence aborted");
                Err(RuntimeError::CloseAborted)
            }
        }
    }

    /// Drains or cancels in-flight work, then moves the manager to `Closed`.
    async fn shutdown(&self, mode: ShutdownMode) -> Result<(), RuntimeError> {
        // Lock fence: an admission that passed the gate before the flip is registered by now.
        let in_flight = self.registry.len();
        info!(mode = mode.as_label(), in_flight, "closing task manager");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(mode.as_label()));

        if mode == ShutdownMode::Cancel {
            let cancelled = self.registry.cancel_all();
            debug!(count = cancelled.len(), "cancelled in-flight tasks");
        }

        let res = self.wait_drained().await;

        if let Some(sem) = &self.semaphore {
            sem.close();
        }
        self.state.transition(ManagerState::Closing, ManagerState::Closed);
        self.closed.cancel();
        info!("task manager closed");
        self.bus.publish(Event::new(EventKind::ManagerClosed));
        res
    }

    /// Waits for the registry to empty, escalating to cancellation after the grace period.
    async fn wait_drained(&self) -> Result<(), RuntimeError> {
        let Some(grace) = self.cfg.grace_period() else {
            self.registry.drained().await;
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        };

        match tokio::time::timeout(grace, self.registry.drained()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.registry.cancel_all();
                error!(?grace, ?stuck, "shutdown grace exceeded; cancelling remaining tasks");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                // Cancelled bodies unwind at their next await; their observers still fire.
                self.registry.drained().await;
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then closes with the configured mode.
    ///
    /// Returns early with `Ok(())` if the manager gets closed by other means first.
    pub async fn close_on_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            sig = shutdown::wait_for_shutdown_signal() => {
                let sig = sig?;
                info!(signal = %sig, "shutdown signal received");
                self.close().await
            }
            _ = self.closed.cancelled() => Ok(()),
        }
    }

    /// Current admission state.
    pub fn state(&self) -> ManagerState {
        self.state.load()
    }

    /// True while submissions are accepted.
    pub fn is_open(&self) -> bool {
        self.state() == ManagerState::Open
    }

    /// True once `close()` finished.
    pub fn is_closed(&self) -> bool {
        self.state() == ManagerState::Closed
    }

    /// Number of admitted tasks that have not reached `Closed` yet.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Sorted names of the in-flight tasks.
    pub fn in_flight_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Subscribes to runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Takes a shared lease; the manager closes when the last lease is released.
    pub fn lease(self: &Arc<Self>) -> ManagerLease {
        ManagerLease::acquire(Arc::clone(self))
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}
