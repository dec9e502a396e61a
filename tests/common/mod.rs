#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use taskgate::{TaskError, TaskSpec};

/// Shared, ordered record of what observers saw.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }

    /// Adds a failure-observer (`<name>:failed:<label>`) and a close-observer (`<name>:closed`).
    pub fn observe<W: ?Sized>(&self, spec: TaskSpec<W>, name: &str) -> TaskSpec<W> {
        let (failed, closed) = (self.clone(), self.clone());
        let (n1, n2) = (name.to_string(), name.to_string());
        spec.on_failed(move |e: &TaskError| failed.push(format!("{n1}:failed:{}", e.as_label())))
            .on_closed(move || closed.push(format!("{n2}:closed")))
    }
}
