//! Crate with runtime integrations for readiness gates
//!
//! This crate connects the gate from `readygate-core` to the world around it:
//! a tokio-backed scheduler, a way to attach a gate to any host type, and an emitter that
//! turns successful transitions into a stream of events.
//!
//! Newcomers should generally start with [`WithReady`] around their own type, driven by
//! [`TokioSpawn`].

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
// Item names repeat their module, e.g. `emitter::ReadyEmitter`
#![allow(clippy::module_name_repetitions)]

pub mod attach;
pub mod config;
pub mod emitter;
pub mod scheduler;

pub use attach::{Ready, ReadyArg, WithReady};
pub use config::Config;
pub use emitter::{ReadyEmitter, ReadyEvent};
pub use scheduler::TokioSpawn;
