//! Settings for gates built by this crate
use serde::{Deserialize, Serialize};

/// Configuration for [`WithReady`](crate::WithReady) and [`ReadyEmitter`](crate::ReadyEmitter)
///
/// Missing fields take their defaults, so a config can be loaded from a partial document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name attached to the gate's log output
    pub name: Option<String>,

    /// How many ready events are buffered per subscriber
    ///
    /// Values below 1 are treated as 1.
    pub event_capacity: usize,

    /// Whether a full event buffer evicts its oldest event
    ///
    /// When disabled, new events are dropped instead while the buffer is full.
    pub overflow: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            event_capacity: 16,
            overflow: true,
        }
    }
}

impl Config {
    /// Names the gate in log output
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets how many ready events are buffered per subscriber
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets whether a full event buffer evicts its oldest event
    #[must_use]
    pub fn overflow(mut self, overflow: bool) -> Self {
        self.overflow = overflow;
        self
    }

    pub(crate) fn capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}
