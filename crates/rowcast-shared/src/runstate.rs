//! Run-state tracking for cooperating tasks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A wait-group-like counter over a set of running tasks.
///
/// The owner calls [`RunState::add`] before spawning a task; the task calls
/// [`RunState::done`] when it exits. [`RunState::stopped`] reports whether
/// every registered task has drained.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    active: Arc<AtomicUsize>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one more running task.
    pub fn add(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark one registered task as finished.
    pub fn done(&self) {
        let prev = self.active.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "RunState::done without matching add");
    }

    /// Number of tasks still running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// True once every registered task has finished. Also true when no task
    /// was ever registered.
    pub fn stopped(&self) -> bool {
        self.active() == 0
    }
}
