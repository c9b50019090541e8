//! Crate with the readiness gate and the types needed to drive it
//!
//! A [`ReadinessGate`] starts out not ready, collects observers, and notifies all of them once a
//! producer marks it ready, either successfully or with a [`Failure`]. Observers are always
//! delivered through a [`Schedule`] implementation on a later turn, never inline.
//!
//! This crate has no async runtime dependency; [`TurnQueue`] is a manually driven scheduler.
//! Runtime integrations live in `readygate-runtime`, and everything is re-exported from
//! `readygate` under `readygate::core`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub use error::{Failure, WaitError};

pub mod gate;
pub use gate::{Callback, ReadinessGate, Wait};

pub mod schedule;
pub use schedule::{Schedule, Task, TurnQueue};

pub mod signal;
pub use signal::{Readiness, Signal};

/// Convenient alias for `Result<T, WaitError>`
pub type Result<T, E = WaitError> = std::result::Result<T, E>;
