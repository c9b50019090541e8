//! What a gate can be told, and what it can be
use std::fmt;

use crate::Failure;

/// A state transition requested through [`ReadinessGate::set_state`](crate::ReadinessGate::set_state)
///
/// Only `false` and failures carry special meaning. Every other value that converts into a
/// `Signal` marks the gate as ready, including numeric probes such as `0`.
#[derive(Clone, Debug)]
pub enum Signal {
    /// Become ready successfully
    Ready,
    /// Become ready carrying a failure
    Failed(Failure),
    /// Return to not-ready, clearing any stored failure
    NotReady,
}

impl From<bool> for Signal {
    fn from(ready: bool) -> Self {
        if ready {
            Signal::Ready
        } else {
            Signal::NotReady
        }
    }
}

impl From<Failure> for Signal {
    fn from(failure: Failure) -> Self {
        Signal::Failed(failure)
    }
}

impl<E> From<Result<(), E>> for Signal
where
    E: Into<Failure>,
{
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Signal::Ready,
            Err(err) => Signal::Failed(err.into()),
        }
    }
}

macro_rules! impl_probe_signal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Signal {
                fn from(_probe: $ty) -> Self {
                    Signal::Ready
                }
            }
        )*
    };
}

impl_probe_signal!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// A snapshot of a gate's state
#[derive(Clone, Debug, Default)]
pub enum Readiness {
    /// Observers are queued until the next ready transition
    #[default]
    NotReady,
    /// Ready, successfully when the payload is `None`
    Ready(Option<Failure>),
}

impl Readiness {
    /// Whether the gate is ready, with or without a failure
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    /// Whether the gate is ready and carries a failure
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Readiness::Ready(Some(_)))
    }

    /// The stored failure, if any
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Readiness::Ready(failure) => failure.as_ref(),
            Readiness::NotReady => None,
        }
    }
}

impl From<Signal> for Readiness {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Ready => Readiness::Ready(None),
            Signal::Failed(failure) => Readiness::Ready(Some(failure)),
            Signal::NotReady => Readiness::NotReady,
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Readiness::NotReady => "not-ready",
            Readiness::Ready(None) => "ready",
            Readiness::Ready(Some(_)) => "failed",
        })
    }
}
