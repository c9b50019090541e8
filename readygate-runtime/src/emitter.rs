//! Turning successful transitions into discrete events
use std::sync::atomic::{AtomicU64, Ordering};

use async_broadcast::{InactiveReceiver, Receiver, Sender, TrySendError};
use educe::Educe;
use readygate_core::{Failure, ReadinessGate, Readiness, Schedule, Signal, Wait};
use tracing::{debug, trace, warn};

use crate::{Config, Ready};

/// Emitted each time a [`ReadyEmitter`] becomes ready successfully
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReadyEvent {
    /// Which successful transition this was, starting at 1
    pub cycle: u64,
}

/// A readiness gate that also broadcasts a [`ReadyEvent`] to subscribers
///
/// The event is emitted only when a transition moves the gate into successful readiness from any
/// other state; re-asserting success emits nothing. It is delivered as an observer of the gate,
/// so it follows every observer released by the same transition.
///
/// The emitter holds no readiness state of its own, everything is read from the wrapped gate.
#[derive(Educe)]
#[educe(Debug)]
pub struct ReadyEmitter<S> {
    gate: ReadinessGate<S>,
    #[educe(Debug(ignore))]
    tx: Sender<ReadyEvent>,
    // An inactive reader that keeps the channel open while nobody is subscribed
    #[educe(Debug(ignore))]
    _rx: InactiveReceiver<ReadyEvent>,
    cycles: AtomicU64,
}

impl<S: Schedule> ReadyEmitter<S> {
    /// Creates a not-ready emitter with the default [`Config`]
    pub fn new(scheduler: S) -> Self {
        Self::with_config(scheduler, &Config::default())
    }

    /// Creates a not-ready emitter configured by `config`
    pub fn with_config(scheduler: S, config: &Config) -> Self {
        let (mut tx, rx) = async_broadcast::broadcast(config.capacity());
        tx.set_overflow(config.overflow);
        let mut gate = ReadinessGate::new(scheduler);
        if let Some(name) = &config.name {
            gate = gate.with_name(name.clone());
        }
        Self {
            gate,
            tx,
            _rx: rx.deactivate(),
            cycles: AtomicU64::new(0),
        }
    }

    /// Returns a stream of future ready events
    ///
    /// Events emitted before subscribing are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ReadyEvent> {
        self.tx.new_receiver()
    }

    /// Number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Moves the gate to the state described by `signal`, emitting an event on success
    pub fn set_state(&self, signal: impl Into<Signal>) {
        let signal = signal.into();
        let becomes_ready = matches!(signal, Signal::Ready)
            && !matches!(self.gate.state(), Readiness::Ready(None));
        self.gate.set_state(signal);
        if !becomes_ready {
            return;
        }

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(gate = ?self.gate.name(), cycle, "gate became ready, scheduling event");
        let tx = self.tx.clone();
        self.gate.register(move |failure| {
            if failure.is_none() {
                emit(&tx, ReadyEvent { cycle });
            }
        });
    }

    /// Registers `callback` to run once the gate is ready
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce(Option<Failure>) + Send + 'static,
    {
        self.gate.register(callback);
    }

    /// Returns a future that settles once the gate is ready
    pub fn wait(&self) -> Wait {
        self.gate.wait()
    }

    /// Whether the gate is ready, with or without a failure
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// The wrapped gate
    pub fn gate(&self) -> &ReadinessGate<S> {
        &self.gate
    }
}

fn emit(tx: &Sender<ReadyEvent>, event: ReadyEvent) {
    match tx.try_broadcast(event) {
        Ok(None) => trace!(cycle = event.cycle, "broadcast ready event"),
        Ok(Some(evicted)) => debug!(
            cycle = event.cycle,
            evicted = evicted.cycle,
            "ready event buffer full, evicted oldest event"
        ),
        Err(TrySendError::Full(_)) => warn!(cycle = event.cycle, "ready event buffer full, dropping event"),
        Err(TrySendError::Inactive(_)) => trace!(cycle = event.cycle, "no active subscribers"),
        Err(TrySendError::Closed(_)) => trace!(cycle = event.cycle, "event channel closed"),
    }
}

impl<S: Schedule> Ready for ReadyEmitter<S> {
    type Scheduler = S;

    fn gate(&self) -> &ReadinessGate<S> {
        &self.gate
    }

    fn set_ready(&self, signal: Signal) {
        self.set_state(signal);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_broadcast::TryRecvError;
    use readygate_core::{Failure, TurnQueue};
    use tracing::Level;
    use tracing_subscriber::util::SubscriberInitExt;

    use super::{ReadyEmitter, ReadyEvent};
    use crate::{Config, Ready, TokioSpawn};

    fn setup_tracing() -> tracing::dispatcher::DefaultGuard {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .finish()
            .set_default()
    }

    #[test]
    fn success_emits_one_event_after_drained_observers() {
        let _tracing = setup_tracing();
        let emitter = ReadyEmitter::new(TurnQueue::new());
        let mut events = emitter.subscribe();
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            emitter.register(move |_| log.lock().unwrap().push("observer"));
        }

        emitter.set_state(true);
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        emitter.gate().scheduler().run_until_idle();

        assert_eq!(*log.lock().unwrap(), vec!["observer"]);
        assert_eq!(events.try_recv(), Ok(ReadyEvent { cycle: 1 }));

        // Re-asserting readiness is not a new event
        emitter.set_state(true);
        emitter.gate().scheduler().run_until_idle();
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn failures_and_resets_emit_nothing() {
        let emitter = ReadyEmitter::new(TurnQueue::new());
        let mut events = emitter.subscribe();
        emitter.set_state(Failure::msg("boom"));
        emitter.set_state(false);
        emitter.gate().scheduler().run_until_idle();
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert!(!emitter.is_ready());
    }

    #[test]
    fn every_cycle_is_numbered() {
        let emitter = ReadyEmitter::new(TurnQueue::new());
        let mut events = emitter.subscribe();
        emitter.set_state(true);
        emitter.set_state(false);
        emitter.set_state(true);
        emitter.set_state(Failure::msg("flaky"));
        emitter.set_state(true);
        emitter.gate().scheduler().run_until_idle();

        let cycles: Vec<u64> = (0..3)
            .map(|_| events.try_recv().map(|e| e.cycle))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(cycles, vec![1, 2, 3]);
    }

    #[test]
    fn events_without_subscribers_are_dropped() {
        let emitter = ReadyEmitter::new(TurnQueue::new());
        assert_eq!(emitter.subscriber_count(), 0);
        emitter.set_state(true);
        emitter.gate().scheduler().run_until_idle();

        let mut late = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 1);
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn small_buffers_keep_the_latest_event() {
        let _tracing = setup_tracing();
        let config = Config::default().event_capacity(1).name("cache");
        let emitter = ReadyEmitter::with_config(TurnQueue::new(), &config);
        assert_eq!(emitter.gate().name(), Some("cache"));
        let mut events = emitter.subscribe();
        for _ in 0..3 {
            emitter.set_state(true);
            emitter.set_state(false);
        }
        emitter.gate().scheduler().run_until_idle();
        // The subscriber learns how many events it missed before getting the latest one
        assert_eq!(events.try_recv(), Err(TryRecvError::Overflowed(2)));
        assert_eq!(events.try_recv(), Ok(ReadyEvent { cycle: 3 }));
    }

    #[tokio::test]
    async fn set_ready_through_the_trait_still_emits() {
        let emitter = ReadyEmitter::new(TokioSpawn::current().unwrap());
        let mut events = emitter.subscribe();
        let wait = emitter.ready();
        emitter.ready_with(true);
        wait.await.unwrap();
        assert_eq!(events.recv().await, Ok(ReadyEvent { cycle: 1 }));
    }
}
