//! # Shared manager leases.
//!
//! Several components can share one [`TaskManager`] without agreeing on who
//! closes it: each takes a [`ManagerLease`] and releases it when done. The
//! release that brings the count to zero closes the manager.
//!
//! ```text
//! lease() ─► count 1 ─► lease()/clone ─► count 2
//! release() ─► count 1 (manager stays open)
//! release() ─► count 0 ─► manager.close()
//! ```
//!
//! A lease dropped without [`release`](ManagerLease::release) still counts
//! down; if it was the last one, the close runs in the background on the
//! manager's runtime.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use crate::core::manager::TaskManager;
use crate::error::RuntimeError;

/// Reference-counted share of a [`TaskManager`].
#[derive(Debug)]
pub struct ManagerLease {
    manager: Option<Arc<TaskManager>>,
}

impl ManagerLease {
    pub(crate) fn acquire(manager: Arc<TaskManager>) -> Self {
        let held = manager.leases.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(held, "manager lease acquired");
        Self {
            manager: Some(manager),
        }
    }

    /// The leased manager.
    pub fn manager(&self) -> Option<&Arc<TaskManager>> {
        self.manager.as_ref()
    }

    /// Gives the lease back; closes the manager if this was the last one.
    pub async fn release(mut self) -> Result<(), RuntimeError> {
        match self.manager.take() {
            Some(manager) if Self::count_down(&manager) => manager.close().await,
            _ => Ok(()),
        }
    }

    /// Decrements the lease count; true if it reached zero.
    fn count_down(manager: &TaskManager) -> bool {
        let prev = manager.leases.fetch_sub(1, Ordering::AcqRel);
        debug!(held = prev - 1, "manager lease released");
        prev == 1
    }
}

impl Clone for ManagerLease {
    fn clone(&self) -> Self {
        match &self.manager {
            Some(manager) => Self::acquire(Arc::clone(manager)),
            None => Self { manager: None },
        }
    }
}

impl Drop for ManagerLease {
    fn drop(&mut self) {
        let Some(manager) = self.manager.take() else {
            return;
        };
        if !Self::count_down(&manager) {
            return;
        }
        let runtime = manager.runtime().clone();
        runtime.spawn(async move {
            if let Err(e) = manager.close().await {
                warn!(error = %e, "closing manager after last lease dropped");
            }
        });
    }
}
