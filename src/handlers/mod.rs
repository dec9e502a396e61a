//! # Task observers.
//!
//! Every task carries two ordered observer lists:
//! - **close-observers** ([`CloseHandler`]): fire exactly once when the task
//!   reaches a terminal state, whatever the outcome;
//! - **failure-observers** ([`FailureHandler`]): fire only when the body fails
//!   (error, panic, timeout, cancellation), always before the close-observers.
//!
//! Handlers are registered on a [`TaskSpec`](crate::TaskSpec) before submission
//! or on the returned [`TaskHandle`](crate::TaskHandle) afterwards. Once terminal
//! dispatch has begun, registration is rejected.

mod handler;
mod set;

pub use handler::{CloseHandler, FailureHandler};
pub(crate) use handler::Labeled;
pub(crate) use set::{DispatchSite, HandlerSet, Handlers, notify_closed, notify_failed};
