//! Deferred delivery of observer notifications
//!
//! A gate never runs observers from inside the call that triggered them. Instead it hands a
//! [`Task`] to a [`Schedule`] implementation, which runs it on a later turn of whatever
//! cooperative scheduler the host uses.
use std::{
    any::Any,
    collections::VecDeque,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{error, trace};

/// A unit of deferred work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on a later turn
///
/// Implementations must not run `task` before `schedule` returns.
pub trait Schedule {
    /// Enqueues `task` to run after the current call stack has unwound
    fn schedule(&self, task: Task);
}

impl<S: Schedule + ?Sized> Schedule for &S {
    fn schedule(&self, task: Task) {
        (**self).schedule(task);
    }
}

impl<S: Schedule + ?Sized> Schedule for Arc<S> {
    fn schedule(&self, task: Task) {
        (**self).schedule(task);
    }
}

impl<S: Schedule + ?Sized> Schedule for Box<S> {
    fn schedule(&self, task: Task) {
        (**self).schedule(task);
    }
}

/// A manually driven FIFO of tasks
///
/// Cloning produces a new handle to the same queue, so a host can give one clone to its gates and
/// keep another to drive them. Each [`run_turn`](Self::run_turn) runs only the tasks that were
/// queued before it started; tasks scheduled while it runs wait for the next turn.
#[derive(Clone, Default)]
pub struct TurnQueue {
    tasks: Arc<Mutex<VecDeque<Task>>>,
}

impl TurnQueue {
    /// Creates an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the tasks queued so far, returning how many ran
    ///
    /// A panicking task is logged and counted; the remaining tasks of the turn still run.
    pub fn run_turn(&self) -> usize {
        // Take the batch first so tasks can schedule more work without deadlocking
        let batch = std::mem::take(&mut *self.tasks.lock());
        let ran = batch.len();
        trace!(tasks = ran, "running turn");
        for task in batch {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
                error!(panic = panic_message(&*panic), "task panicked");
            }
        }
        ran
    }

    /// Runs turns until no tasks remain, returning how many ran in total
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            match self.run_turn() {
                0 => return total,
                ran => total += ran,
            }
        }
    }

    /// Number of tasks waiting for the next turn
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether no tasks are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Schedule for TurnQueue {
    fn schedule(&self, task: Task) {
        self.tasks.lock().push_back(task);
    }
}

impl fmt::Debug for TurnQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnQueue")
            .field("queued", &self.len())
            .finish()
    }
}

/// Best effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}
