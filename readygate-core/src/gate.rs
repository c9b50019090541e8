//! The readiness gate itself
use std::{
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::oneshot, FutureExt};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::{schedule::panic_message, Failure, Readiness, Schedule, Signal, WaitError};

/// An observer waiting for the gate to become ready
///
/// Receives the failure the gate carries, or `None` on success.
pub type Callback = Box<dyn FnOnce(Option<Failure>) + Send + 'static>;

struct Inner {
    state: Readiness,
    pending: Vec<Callback>,
}

/// A gate that starts out not ready and notifies its observers once it becomes ready
///
/// Observers registered while the gate is not ready are queued in registration order. The
/// transition into [`Readiness::Ready`] drains the queue and hands every queued observer to the
/// scheduler as one batch, so they run in FIFO order on a later turn. Observers registered while
/// the gate is already ready are scheduled straight away with the current payload and are never
/// queued.
///
/// Neither [`register`](Self::register) nor [`set_state`](Self::set_state) ever run an observer
/// inline, so an observer cannot be re-entered from the call that triggered it. A panicking
/// observer is logged and skipped; the rest of its batch is still notified.
///
/// ```
/// use readygate_core::{ReadinessGate, TurnQueue};
///
/// let gate = ReadinessGate::new(TurnQueue::new());
/// gate.register(|failure| assert!(failure.is_none()));
/// gate.set_state(true);
/// assert_eq!(gate.scheduler().run_turn(), 1);
/// ```
pub struct ReadinessGate<S> {
    inner: Mutex<Inner>,
    scheduler: S,
    name: Option<String>,
}

impl<S: Schedule> ReadinessGate<S> {
    /// Creates a gate that is not ready and has no observers
    pub fn new(scheduler: S) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Readiness::NotReady,
                pending: Vec::new(),
            }),
            scheduler,
            name: None,
        }
    }

    /// Names the gate in log output
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers `callback` to run once the gate is ready
    ///
    /// If the gate is already ready, `callback` is scheduled immediately with the current
    /// payload. Otherwise it is queued until the next transition into ready, and then receives
    /// whatever payload that transition carries.
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce(Option<Failure>) + Send + 'static,
    {
        self.register_boxed(Box::new(callback));
    }

    /// Like [`register`](Self::register), for callbacks that are already boxed
    #[tracing::instrument(level = "trace", skip_all, fields(gate = ?self.name))]
    pub fn register_boxed(&self, callback: Callback) {
        let mut inner = self.inner.lock();
        if let Readiness::Ready(failure) = &inner.state {
            let failure = failure.clone();
            drop(inner);
            trace!("gate already ready, scheduling observer");
            let name = self.name.clone();
            self.scheduler
                .schedule(Box::new(move || deliver(name.as_deref(), callback, failure)));
        } else {
            inner.pending.push(callback);
            trace!(pending = inner.pending.len(), "queued observer");
        }
    }

    /// Returns a future that settles once the gate is ready
    ///
    /// Resolves to `Ok(())` on success and to [`WaitError::Failed`] when the gate carries a
    /// failure. A reset to not-ready leaves the future pending until the next ready transition.
    ///
    /// # Errors
    ///
    /// Fails with [`WaitError::GateDropped`] if the gate is dropped before it becomes ready.
    #[tracing::instrument(level = "trace", skip_all, fields(gate = ?self.name))]
    pub fn wait(&self) -> Wait {
        let (tx, rx) = oneshot::channel();
        self.register(move |failure| {
            // The waiter may have given up, which is fine
            let _ = tx.send(failure);
        });
        Wait { rx }
    }

    /// Moves the gate to the state described by `signal`
    ///
    /// Any transition into ready, including re-asserting the current one, drains the observers
    /// queued so far and schedules them with the new payload. Moving to not-ready clears the stored
    /// failure and schedules nothing; observers that are still queued stay queued.
    #[tracing::instrument(level = "trace", skip_all, fields(gate = ?self.name))]
    pub fn set_state(&self, signal: impl Into<Signal>) {
        let next = Readiness::from(signal.into());
        let mut inner = self.inner.lock();
        debug!(from = %inner.state, to = %next, "transition");
        inner.state = next;

        let Readiness::Ready(failure) = &inner.state else {
            return;
        };
        if inner.pending.is_empty() {
            trace!("no observers to drain");
            return;
        }
        let failure = failure.clone();
        let drained = std::mem::take(&mut inner.pending);
        drop(inner);

        trace!(observers = drained.len(), "draining observers");
        let name = self.name.clone();
        self.scheduler.schedule(Box::new(move || {
            for callback in drained {
                deliver(name.as_deref(), callback, failure.clone());
            }
        }));
    }
}

fn deliver(gate: Option<&str>, callback: Callback, failure: Option<Failure>) {
    trace!(gate = ?gate, failed = failure.is_some(), "notifying observer");
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(move || callback(failure))) {
        error!(gate = ?gate, panic = panic_message(&*panic), "observer panicked");
    }
}

impl<S> ReadinessGate<S> {
    /// Whether the gate is ready, with or without a failure
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.lock().state.is_ready()
    }

    /// The failure the gate currently carries
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        self.inner.lock().state.failure().cloned()
    }

    /// A snapshot of the current state
    #[must_use]
    pub fn state(&self) -> Readiness {
        self.inner.lock().state.clone()
    }

    /// Whether any observers are queued for the next ready transition
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().pending.is_empty()
    }

    /// Number of observers queued for the next ready transition
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// The scheduler observers are delivered through
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The name given through [`with_name`](Self::with_name)
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<S: Schedule + Default> Default for ReadinessGate<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> fmt::Debug for ReadinessGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ReadinessGate")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("pending", &inner.pending.len())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`ReadinessGate::wait`]
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct Wait {
    rx: oneshot::Receiver<Option<Failure>>,
}

impl Future for Wait {
    type Output = crate::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|delivered| match delivered {
            Ok(None) => Ok(()),
            Ok(Some(failure)) => Err(WaitError::Failed(failure)),
            Err(oneshot::Canceled) => Err(WaitError::GateDropped),
        })
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, task::Poll};

    use futures::{pin_mut, poll, FutureExt};
    use parking_lot::Mutex;
    use tracing::Level;
    use tracing_subscriber::util::SubscriberInitExt;

    use super::ReadinessGate;
    use crate::{Failure, Readiness, Signal, TurnQueue, WaitError};

    fn setup_tracing() -> tracing::dispatcher::DefaultGuard {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .finish()
            .set_default()
    }

    type Log = Arc<Mutex<Vec<(&'static str, Option<String>)>>>;

    fn observe(gate: &ReadinessGate<TurnQueue>, log: &Log, label: &'static str) {
        let log = log.clone();
        gate.register(move |failure| log.lock().push((label, failure.map(|f| f.to_string()))));
    }

    #[test]
    fn starts_out_not_ready() {
        let gate = ReadinessGate::<TurnQueue>::default();
        assert!(!gate.is_ready());
        assert!(gate.failure().is_none());
        assert!(!gate.has_pending());
        assert!(matches!(gate.state(), Readiness::NotReady));
    }

    #[test]
    fn drains_observers_in_registration_order() {
        let _tracing = setup_tracing();
        let gate = ReadinessGate::new(TurnQueue::new()).with_name("drain");
        let log = Log::default();
        observe(&gate, &log, "a");
        observe(&gate, &log, "b");
        observe(&gate, &log, "c");
        assert_eq!(gate.pending_len(), 3);

        gate.set_state(true);
        assert!(!gate.has_pending());
        // Nothing runs before the current call stack unwinds
        assert!(log.lock().is_empty());

        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("a", None), ("b", None), ("c", None)]);
    }

    #[test]
    fn late_observers_are_scheduled_not_queued() {
        let _tracing = setup_tracing();
        let gate = ReadinessGate::new(TurnQueue::new());
        gate.set_state(Failure::msg("boom"));
        assert!(gate.is_ready());
        assert_eq!(gate.failure().map(|f| f.to_string()).as_deref(), Some("boom"));

        let log = Log::default();
        observe(&gate, &log, "late");
        assert!(!gate.has_pending());
        assert!(log.lock().is_empty());

        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("late", Some("boom".to_string()))]);
    }

    #[test]
    fn reasserting_ready_does_not_notify_twice() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let log = Log::default();
        observe(&gate, &log, "a");
        observe(&gate, &log, "b");
        gate.set_state(true);
        gate.scheduler().run_until_idle();

        gate.set_state(true);
        assert_eq!(gate.scheduler().run_until_idle(), 0);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn reset_queues_new_observers() {
        let gate = ReadinessGate::new(TurnQueue::new());
        gate.set_state(true);
        gate.set_state(false);
        assert!(!gate.is_ready());

        let log = Log::default();
        observe(&gate, &log, "queued");
        assert!(gate.has_pending());
        assert_eq!(gate.scheduler().run_until_idle(), 0);
        assert!(log.lock().is_empty());

        gate.set_state(1_u8);
        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("queued", None)]);
    }

    #[test]
    fn reset_keeps_observers_queued_before_it() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let log = Log::default();
        observe(&gate, &log, "early");
        gate.set_state(false);
        assert_eq!(gate.pending_len(), 1);

        gate.set_state(Signal::Ready);
        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("early", None)]);
    }

    #[test]
    fn failure_then_reset_then_success() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let log = Log::default();
        gate.set_state(Failure::msg("x"));
        observe(&gate, &log, "first");
        gate.set_state(false);
        gate.set_state(true);
        observe(&gate, &log, "second");

        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("first", Some("x".to_string())), ("second", None)]);
    }

    #[test]
    fn transitions_between_failure_and_success() {
        let gate = ReadinessGate::new(TurnQueue::new());
        gate.set_state(true);
        gate.set_state(Failure::msg("went bad"));
        assert!(gate.state().is_failed());
        gate.set_state(true);
        assert!(gate.is_ready());
        assert!(gate.failure().is_none());
    }

    #[test]
    fn second_failure_overwrites_the_first() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let log = Log::default();
        gate.set_state(Failure::msg("first"));
        gate.set_state(Failure::msg("second"));
        observe(&gate, &log, "late");
        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("late", Some("second".to_string()))]);
    }

    #[test]
    fn drained_observers_keep_the_payload_of_their_transition() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let log = Log::default();
        observe(&gate, &log, "a");
        gate.set_state(Failure::msg("boom"));
        // Fixing the gate before the drain runs does not change what was delivered
        gate.set_state(true);
        gate.scheduler().run_until_idle();
        assert_eq!(*log.lock(), vec![("a", Some("boom".to_string()))]);
    }

    #[test]
    fn observers_may_register_from_inside_a_callback() {
        let gate = Arc::new(ReadinessGate::new(TurnQueue::new()));
        let log = Log::default();
        {
            let (inner_gate, log) = (gate.clone(), log.clone());
            gate.register(move |_| {
                log.lock().push(("outer", None));
                let log = log.clone();
                inner_gate.register(move |_| log.lock().push(("inner", None)));
            });
        }
        gate.set_state(true);

        assert_eq!(gate.scheduler().run_turn(), 1);
        assert_eq!(*log.lock(), vec![("outer", None)]);
        assert_eq!(gate.scheduler().run_turn(), 1);
        assert_eq!(*log.lock(), vec![("outer", None), ("inner", None)]);
    }

    #[tokio::test]
    async fn panicking_observer_does_not_starve_its_batch() {
        let _tracing = setup_tracing();
        let gate = ReadinessGate::new(TurnQueue::new()).with_name("panicky");
        let log = Log::default();
        gate.register(|_| panic!("observer blew up"));
        let wait = gate.wait();
        observe(&gate, &log, "after");

        gate.set_state(true);
        assert_eq!(gate.scheduler().run_until_idle(), 1);
        assert!(matches!(wait.await, Ok(())));
        assert_eq!(*log.lock(), vec![("after", None)]);
    }

    #[test]
    fn panicking_late_observer_leaves_the_gate_usable() {
        let gate = ReadinessGate::new(TurnQueue::new());
        gate.set_state(Failure::msg("down"));
        gate.register(|_| panic!("late observer blew up"));
        let log = Log::default();
        observe(&gate, &log, "next");
        assert_eq!(gate.scheduler().run_until_idle(), 2);
        assert_eq!(*log.lock(), vec![("next", Some("down".to_string()))]);
        assert!(gate.state().is_failed());
    }

    #[test]
    fn gates_are_isolated() {
        let queue = TurnQueue::new();
        let some = ReadinessGate::new(queue.clone());
        let another = ReadinessGate::new(queue.clone());
        let log = Log::default();
        observe(&another, &log, "another");
        observe(&some, &log, "some");
        observe(&some, &log, "some");
        some.set_state(true);
        queue.run_until_idle();
        assert_eq!(log.lock().len(), 2);

        another.set_state(true);
        queue.run_until_idle();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn debug_output_skips_callbacks() {
        let gate = ReadinessGate::new(TurnQueue::new()).with_name("db");
        gate.register(|_| {});
        let out = format!("{gate:?}");
        assert!(out.contains("\"db\""));
        assert!(out.contains("pending: 1"));
    }

    #[tokio::test]
    async fn wait_resolves_after_ready() {
        let _tracing = setup_tracing();
        let gate = ReadinessGate::new(TurnQueue::new());
        let wait = gate.wait();
        pin_mut!(wait);
        assert!(poll!(wait.as_mut()).is_pending());

        gate.set_state(true);
        assert!(poll!(wait.as_mut()).is_pending());
        gate.scheduler().run_turn();
        assert!(matches!(poll!(wait), Poll::Ready(Ok(()))));
    }

    #[tokio::test]
    async fn wait_rejects_with_the_failure() {
        let gate = ReadinessGate::new(TurnQueue::new());
        gate.set_state(Failure::msg("error"));
        let wait = gate.wait();
        pin_mut!(wait);
        assert!(poll!(wait.as_mut()).is_pending());

        gate.scheduler().run_turn();
        match poll!(wait) {
            Poll::Ready(Err(WaitError::Failed(failure))) => assert_eq!(failure.to_string(), "error"),
            other => panic!("expected the stored failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wait_stays_pending_after_reset() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let wait = gate.wait();
        pin_mut!(wait);
        gate.set_state(false);
        gate.scheduler().run_until_idle();
        assert!(poll!(wait.as_mut()).is_pending());
        assert!(gate.has_pending());
    }

    #[test]
    fn wait_reports_a_dropped_gate() {
        let gate = ReadinessGate::new(TurnQueue::new());
        let wait = gate.wait();
        drop(gate);
        assert!(matches!(wait.now_or_never(), Some(Err(WaitError::GateDropped))));
    }

    #[tokio::test]
    async fn wait_chained_from_an_observer_resolves() {
        let gate = Arc::new(ReadinessGate::new(TurnQueue::new()));
        let second = Arc::new(Mutex::new(None));
        {
            let (inner_gate, second) = (gate.clone(), second.clone());
            gate.register(move |_| *second.lock() = Some(inner_gate.wait()));
        }
        gate.set_state(true);
        gate.scheduler().run_until_idle();

        let wait = second.lock().take();
        assert!(matches!(wait.map(FutureExt::now_or_never), Some(Some(Ok(())))));
    }
}
