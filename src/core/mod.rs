//! Runtime core: admission, execution and shutdown.
//!
//! The public entry point is [`TaskManager`]; the rest of this module supports it.
//!
//! Internal modules:
//! - [`runner`]: drives one task from slot acquisition to `Closed`, dispatching handlers;
//! - [`registry`]: in-flight accounting, admission under lock;
//! - [`manager`]: the open/closing/closed gate, submission and `close()`;
//! - [`lease`]: shared ownership that closes on the last release;
//! - [`shutdown`]: cross-platform OS signal handling.

mod builder;
mod config;
mod handle;
mod lease;
mod manager;
mod registry;
mod runner;
mod shutdown;
mod state;

pub use builder::TaskManagerBuilder;
pub use config::{Config, ShutdownMode};
pub use handle::{ResultHandle, TaskHandle};
pub use lease::ManagerLease;
pub use manager::TaskManager;
pub use state::{ManagerState, TaskState};
