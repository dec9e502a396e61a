//! # In-flight registry.
//!
//! Tracks every admitted task that has not reached `Closed` yet:
//! `TaskId → (name, cancellation token)`.
//!
//! ## Rules
//! - Admission runs the caller's gate and the insert under one lock, so the
//!   manager's state check and the registration are atomic with respect to
//!   `close()` (which flips the state, then takes this lock).
//! - Each admitted task holds an [`InFlight`] guard; dropping it removes the
//!   entry, whatever path the wrapper took.
//! - The count is mirrored into a `watch` channel so `close()` can wait for
//!   the registry to empty without polling.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::SubmitError;
use crate::tasks::TaskId;

struct Entry {
    name: Arc<str>,
    cancel: CancellationToken,
}

/// Registry of in-flight tasks.
pub(crate) struct Registry {
    tasks: Mutex<HashMap<TaskId, Entry>>,
    count: watch::Sender<usize>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Self> {
        let (count, _rx) = watch::channel(0);
        Arc::new(Self {
            tasks: Mutex::new(HashMap::new()),
            count,
        })
    }

    /// Runs `gate` with the current in-flight count and, if it passes, registers the task.
    pub(crate) fn admit(
        self: &Arc<Self>,
        id: TaskId,
        name: Arc<str>,
        cancel: CancellationToken,
        gate: impl FnOnce(usize) -> Result<(), SubmitError>,
    ) -> Result<InFlight, SubmitError> {
        let mut tasks = self.tasks.lock();
        gate(tasks.len())?;
        tasks.insert(id, Entry { name, cancel });
        self.count.send_replace(tasks.len());
        Ok(InFlight {
            registry: Arc::clone(self),
            id,
        })
    }

    fn remove(&self, id: TaskId) {
        let mut tasks = self.tasks.lock();
        if tasks.remove(&id).is_some() {
            self.count.send_replace(tasks.len());
        }
    }

    /// Number of in-flight tasks.
    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Sorted names of in-flight tasks.
    pub(crate) fn names(&self) -> Vec<String> {
        let tasks = self.tasks.lock();
        let mut names: Vec<String> = tasks.values().map(|e| e.name.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Cancels every in-flight task and returns their sorted names.
    pub(crate) fn cancel_all(&self) -> Vec<String> {
        let tasks = self.tasks.lock();
        let mut names = Vec::with_capacity(tasks.len());
        for entry in tasks.values() {
            entry.cancel.cancel();
            names.push(entry.name.to_string());
        }
        names.sort_unstable();
        names
    }

    /// Completes once the registry is empty.
    pub(crate) async fn drained(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Registration of one admitted task; removes it from the registry on drop.
pub(crate) struct InFlight {
    registry: Arc<Registry>,
    id: TaskId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn admit(reg: &Arc<Registry>, name: &str) -> InFlight {
        reg.admit(
            TaskId::next(),
            Arc::from(name),
            CancellationToken::new(),
            |_| Ok(()),
        )
        .expect("admitted")
    }

    #[test]
    fn guard_drop_removes_entry() {
        let reg = Registry::new();
        let a = admit(&reg, "b-task");
        let _b = admit(&reg, "a-task");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names(), vec!["a-task", "b-task"]);

        drop(a);
        assert_eq!(reg.names(), vec!["a-task"]);
    }

    #[test]
    fn gate_rejection_registers_nothing() {
        let reg = Registry::new();
        let res = reg.admit(
            TaskId::next(),
            Arc::from("x"),
            CancellationToken::new(),
            |_| Err(SubmitError::Closed),
        );
        assert!(matches!(res, Err(SubmitError::Closed)));
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn gate_sees_current_count() {
        let reg = Registry::new();
        let _a = admit(&reg, "a");
        let res = reg.admit(TaskId::next(), Arc::from("b"), CancellationToken::new(), |n| {
            if n >= 1 {
                Err(SubmitError::Full { capacity: 1 })
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(SubmitError::Full { capacity: 1 })));
    }

    #[test]
    fn cancel_all_fires_every_token() {
        let reg = Registry::new();
        let token = CancellationToken::new();
        let _g = reg
            .admit(TaskId::next(), Arc::from("t"), token.clone(), |_| Ok(()))
            .expect("admitted");
        assert_eq!(reg.cancel_all(), vec!["t"]);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn drained_completes_when_last_guard_drops() {
        let reg = Registry::new();
        let g = admit(&reg, "slow");

        let waiter = {
            let reg = Arc::clone(&reg);
            tokio::spawn(async move { reg.drained().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(g);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drained in time")
            .expect("join");
    }
}
