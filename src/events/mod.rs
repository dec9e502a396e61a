//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the task manager and the execution
//! wrapper.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskManager` (admission, shutdown), `runner::execute`
//!   (task lifecycle), `HandlerSet` dispatch (handler panics).
//! - **Consumers**: whoever calls [`TaskManager::subscribe`](crate::TaskManager::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
