//! Giving arbitrary host types a readiness surface
//!
//! A host either implements [`Ready`] by exposing a gate it owns, or gets wrapped in
//! [`WithReady`]. Either way each host instance owns its own [`ReadinessGate`], so no state is
//! shared between instances.
use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use readygate_core::{Callback, Failure, ReadinessGate, Schedule, Signal, Wait};

use crate::Config;

/// The overloaded argument of [`Ready::ready_with`]
///
/// Mirrors a single `ready(..)` entry point whose meaning depends on what it is given: nothing
/// asks for a future, a callback registers an observer, anything else sets the state.
pub enum ReadyArg {
    /// Return a future that settles once ready
    Wait,
    /// Register an observer
    Register(Callback),
    /// Transition the gate
    Set(Signal),
}

impl ReadyArg {
    /// Wraps a callback as an observer registration
    pub fn callback<F>(callback: F) -> Self
    where
        F: FnOnce(Option<Failure>) + Send + 'static,
    {
        ReadyArg::Register(Box::new(callback))
    }
}

impl From<Option<Callback>> for ReadyArg {
    fn from(callback: Option<Callback>) -> Self {
        match callback {
            Some(callback) => ReadyArg::Register(callback),
            None => ReadyArg::Wait,
        }
    }
}

impl From<Callback> for ReadyArg {
    fn from(callback: Callback) -> Self {
        ReadyArg::Register(callback)
    }
}

impl From<Signal> for ReadyArg {
    fn from(signal: Signal) -> Self {
        ReadyArg::Set(signal)
    }
}

impl From<bool> for ReadyArg {
    fn from(ready: bool) -> Self {
        ReadyArg::Set(ready.into())
    }
}

impl From<Failure> for ReadyArg {
    fn from(failure: Failure) -> Self {
        ReadyArg::Set(failure.into())
    }
}

impl fmt::Debug for ReadyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyArg::Wait => f.write_str("Wait"),
            ReadyArg::Register(_) => f.write_str("Register(..)"),
            ReadyArg::Set(signal) => f.debug_tuple("Set").field(signal).finish(),
        }
    }
}

/// A host that exposes readiness through a gate it owns
///
/// Only [`gate`](Self::gate) has to be implemented. State changes go through
/// [`set_ready`](Self::set_ready), so a host that decorates transitions overrides that one method.
pub trait Ready {
    /// The scheduler the host's gate delivers observers through
    type Scheduler: Schedule;

    /// The host's own gate
    fn gate(&self) -> &ReadinessGate<Self::Scheduler>;

    /// Returns a future that settles once the host is ready
    fn ready(&self) -> Wait {
        self.gate().wait()
    }

    /// Registers `callback` to run once the host is ready
    fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(Option<Failure>) + Send + 'static,
        Self: Sized,
    {
        self.gate().register(callback);
    }

    /// Marks the host ready, failed or not ready
    fn set_ready(&self, signal: Signal) {
        self.gate().set_state(signal);
    }

    /// Whether the host is ready, with or without a failure
    fn is_ready(&self) -> bool {
        self.gate().is_ready()
    }

    /// The single overloaded entry point
    ///
    /// Returns a future only for [`ReadyArg::Wait`].
    fn ready_with(&self, arg: impl Into<ReadyArg>) -> Option<Wait>
    where
        Self: Sized,
    {
        match arg.into() {
            ReadyArg::Wait => Some(self.ready()),
            ReadyArg::Register(callback) => {
                self.gate().register_boxed(callback);
                None
            }
            ReadyArg::Set(signal) => {
                self.set_ready(signal);
                None
            }
        }
    }
}

/// Attaches a private gate to any host value
///
/// Dereferences to the host, so the host's own API stays available.
#[derive(Debug)]
pub struct WithReady<T, S> {
    inner: T,
    gate: ReadinessGate<S>,
}

impl<T, S: Schedule> WithReady<T, S> {
    /// Wraps `inner` with a gate delivering through `scheduler`
    pub fn new(inner: T, scheduler: S) -> Self {
        Self {
            inner,
            gate: ReadinessGate::new(scheduler),
        }
    }

    /// Like [`new`](Self::new), naming the gate from `config`
    pub fn with_config(inner: T, scheduler: S, config: &Config) -> Self {
        let mut gate = ReadinessGate::new(scheduler);
        if let Some(name) = &config.name {
            gate = gate.with_name(name.clone());
        }
        Self { inner, gate }
    }

    /// Unwraps the host, dropping the gate
    ///
    /// Waiters that have not been notified yet settle with `GateDropped`.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T, S: Schedule> Ready for WithReady<T, S> {
    type Scheduler = S;

    fn gate(&self) -> &ReadinessGate<S> {
        &self.gate
    }
}

impl<T, S> Deref for WithReady<T, S> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T, S> DerefMut for WithReady<T, S> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}
