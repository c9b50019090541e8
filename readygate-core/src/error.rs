use std::{error::Error as StdError, fmt, sync::Arc};
use thiserror::Error;

/// An opaque failure carried by a gate that became ready without succeeding.
///
/// Cloning is cheap, every observer of the same transition receives a clone of one shared payload.
/// Callers that know what was stored can get it back with [`Failure::downcast_ref`].
#[derive(Clone, Error)]
#[error(transparent)]
pub struct Failure(Arc<dyn StdError + Send + Sync + 'static>);

impl Failure {
    /// Wraps an arbitrary error
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Creates a failure from a plain message
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(Message(message.to_string()))
    }

    /// Returns the wrapped error if it is of type `E`
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Whether both failures are clones of the same payload
    #[must_use]
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.0).finish()
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for Failure {
    fn from(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self(Arc::from(error))
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(Message(message))
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Why a [`Wait`](crate::Wait) future settled without the gate becoming ready successfully
#[derive(Clone, Debug, Error)]
pub enum WaitError {
    /// The gate became ready carrying a failure
    #[error("gate became ready with a failure: {0}")]
    Failed(#[source] Failure),

    /// The gate or its scheduler was dropped before the waiter was notified
    #[error("gate was dropped before it became ready")]
    GateDropped,
}

impl WaitError {
    /// The failure the gate reported, if any
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            WaitError::Failed(failure) => Some(failure),
            WaitError::GateDropped => None,
        }
    }
}
