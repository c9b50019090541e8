//! Delivers gate observers on a tokio runtime
use readygate_core::{Schedule, Task};
use tokio::runtime::{Handle, TryCurrentError};
use tracing::trace;

/// A [`Schedule`] implementation that spawns each task onto a tokio runtime
///
/// A drained batch of observers is a single task, so observers released by one transition still
/// run in registration order. Separate tasks are ordered however the runtime orders them.
///
/// On a multi-threaded runtime a spawned task may start on another worker before the scheduling
/// call returns. Use a current-thread runtime when observers must not overlap with the producer.
#[derive(Clone, Debug)]
pub struct TokioSpawn {
    handle: Handle,
}

impl TokioSpawn {
    /// Spawns onto the runtime behind `handle`
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawns onto the runtime the caller is running in
    ///
    /// # Errors
    ///
    /// Fails when called outside of a tokio runtime.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// The runtime tasks are spawned onto
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Schedule for TokioSpawn {
    fn schedule(&self, task: Task) {
        trace!("spawning observer task");
        // Detached, observers report back through their own channels
        drop(self.handle.spawn(async move { task() }));
    }
}
