//! # taskgate
//!
//! **Taskgate** runs independent async units of work off the caller's thread,
//! tells interested parties exactly once how each one ended, and shuts down
//! through a one-way open → closing → closed gate.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   TaskSpec (work + handlers)        TaskSpec               TaskSpec
//!          │                             │                      │
//!          ▼                             ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskManager                                                      │
//! │  - ManagerState (Open / Closing / Closed, atomic CAS)             │
//! │  - Registry (in-flight tasks, admission under lock)               │
//! │  - Semaphore (max_concurrent; none = unbounded)                   │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   runner::execute    runner::execute    runner::execute    (spawned on the runtime)
//!   slot → body → failure-observers → close-observers → Closed
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!    TaskHandle        ResultHandle<T>     TaskHandle         (kept by the caller)
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit(spec)
//!   ├─ manager not Open  ─► Err(SubmitError::Closed), nothing runs, no handler fires
//!   ├─ max_pending hit   ─► Err(SubmitError::Full)
//!   └─ admitted ─► Submitted ─► Running ─► Succeeded | Failed ─► Closed
//!                      └──────────┴── close()/cancel ──────────► Closed
//!
//! close()
//!   Open ─► Closing ─► drain (or cancel) in-flight ─► Closed
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                               |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------------|
//! | **Tasks**         | Fire-and-forget and value-producing work, closures or traits. | [`Task`], [`ReturnValueTask`], [`TaskFn`], [`CallFn`] |
//! | **Observers**     | Close- and failure-observers, fired at most once, in order.   | [`CloseHandler`], [`FailureHandler`]             |
//! | **Manager**       | Admission gate, worker pool, drain/cancel shutdown.           | [`TaskManager`], [`ShutdownMode`]                |
//! | **Handles**       | Late registration, cancellation, results.                     | [`TaskHandle`], [`ResultHandle`]                 |
//! | **Events**        | Lifecycle event stream for observability.                     | [`Event`], [`EventKind`]                         |
//! | **Errors**        | Typed errors for admission, execution and shutdown.           | [`SubmitError`], [`TaskError`], [`RuntimeError`] |
//! | **Configuration** | Concurrency, admission limit, grace, timeouts.                | [`Config`]                                       |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgate::{CallFn, Config, TaskContext, TaskError, TaskManager, TaskSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::fixed(4);
//!     cfg.grace = Duration::from_secs(5);
//!     let manager = TaskManager::new(cfg)?;
//!
//!     let spec = TaskSpec::value(CallFn::arc("count-datasets", |ctx: TaskContext| async move {
//!         if ctx.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         Ok(3usize)
//!     }))
//!     .on_failed(|e: &TaskError| eprintln!("count failed: {e}"))
//!     .on_closed(|| println!("count closed"));
//!
//!     let count = manager.submit_value(spec)?.join().await?;
//!     assert_eq!(count, 3);
//!
//!     manager.close().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod handlers;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    Config, ManagerLease, ManagerState, ResultHandle, ShutdownMode, TaskHandle, TaskManager,
    TaskManagerBuilder, TaskState,
};
pub use error::{RegisterError, RuntimeError, SubmitError, TaskError};
pub use events::{Event, EventKind};
pub use handlers::{CloseHandler, FailureHandler};
pub use tasks::{
    CallFn, CallRef, ReturnValueTask, Task, TaskContext, TaskFn, TaskId, TaskRef, TaskSpec,
};
