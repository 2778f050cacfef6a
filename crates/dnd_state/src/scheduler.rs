//! Deferred task queue — the microtask tier.
//!
//! Work queued here runs after the current synchronous code returns control
//! to whoever drives the queue, and before any coarser-grained work that
//! driver schedules afterwards. Tasks run strictly in FIFO order; tasks
//! queued by a running task are appended and run in the same flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::debug;

use crate::error::StateError;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Single-threaded FIFO of deferred tasks.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
    flushing: Cell<bool>,
}

impl TaskQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to the back of the queue.
    pub fn queue(&self, task: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Returns the number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Returns `true` if no task is waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run queued tasks until the queue is empty.
    ///
    /// Returns the number of tasks that ran. A flush requested from inside a
    /// running task returns `Ok(0)`; the outer flush picks up the remaining
    /// work.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Task`] for the first task that fails. The drain
    /// stops there and later tasks stay queued for the next flush.
    pub fn flush(&self) -> Result<usize, StateError> {
        if self.flushing.replace(true) {
            return Ok(0);
        }
        let _guard = FlushGuard(&self.flushing);

        let mut ran = 0;
        let result = loop {
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break Ok(ran);
            };
            ran += 1;
            if let Err(err) = task() {
                break Err(StateError::Task(err));
            }
        };

        debug!(ran, pending = self.pending(), "task queue flushed");
        result
    }
}

/// Clears the flushing flag on exit, including when a task panics.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .field("flushing", &self.flushing.get())
            .finish()
    }
}
