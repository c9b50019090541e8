//! Readygate is an umbrella-crate for readiness gates in Rust.
//!
//! # Overview
//!
//! A readiness gate starts out not ready. Observers register interest in the moment it becomes
//! ready, and a single producer later marks it ready, either successfully or with a failure.
//! Every queued observer is then notified, and any observer registering afterwards is notified
//! straight away. Notifications are always delivered on a later turn of a scheduler, never from
//! inside the call that triggered them.
//!
//! The main modules are:
//!
//! - [`core`](crate::core) with the [`ReadinessGate`](crate::ReadinessGate) itself, its
//!   [`Signal`](crate::Signal)s and the [`Schedule`](crate::Schedule) seam
//! - [`runtime`](crate::runtime) with the tokio scheduler, host attachment through
//!   [`Ready`](crate::runtime::Ready) / [`WithReady`](crate::runtime::WithReady), and the
//!   [`ReadyEmitter`](crate::runtime::ReadyEmitter)
//!
//! # Using a gate
//! ```
//! use readygate::{ReadinessGate, TurnQueue};
//!
//! let gate = ReadinessGate::new(TurnQueue::new());
//! gate.register(|failure| println!("ready, failure: {failure:?}"));
//! gate.set_state(true);
//!
//! // Observers run on the next turn, not inside set_state
//! assert_eq!(gate.scheduler().run_turn(), 1);
//! ```
//!
//! # Making your own type awaitable
//! ```no_run
//! use readygate::runtime::{Ready, TokioSpawn, WithReady};
//!
//! struct Connection {
//!     url: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = std::sync::Arc::new(WithReady::new(
//!         Connection { url: "db://primary".into() },
//!         TokioSpawn::current()?,
//!     ));
//!
//!     let producer = conn.clone();
//!     tokio::spawn(async move {
//!         // .. connect here ..
//!         producer.ready_with(true);
//!     });
//!
//!     conn.ready().await?;
//!     println!("connected to {}", conn.url);
//!     Ok(())
//! }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

macro_rules! cfg_runtime {
    ($($item:item)*) => {
        $(
            #[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
            #[cfg(feature = "runtime")]
            $item
        )*
    }
}

cfg_runtime! {
    /// Re-exports from [`readygate-runtime`](readygate_runtime)
    #[doc(inline)]
    pub use readygate_runtime as runtime;
}

/// Re-exports from [`readygate_core`](readygate_core)
#[doc(inline)]
pub use readygate_core as core;

pub use crate::core::{
    Callback, Failure, Readiness, ReadinessGate, Result, Schedule, Signal, Task, TurnQueue, Wait,
    WaitError,
};
