use readygate::{Failure, ReadinessGate, TurnQueue};
use tracing::*;

// Drives a gate by hand, the way a single-threaded event loop would
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let queue = TurnQueue::new();
    let gate = ReadinessGate::new(queue.clone()).with_name("cache");

    for name in ["warmup", "metrics", "http"] {
        gate.register(move |failure| match failure {
            None => info!("{name}: cache is ready"),
            Some(err) => warn!("{name}: cache failed: {err}"),
        });
    }
    info!("queued {} observers", gate.pending_len());

    gate.set_state(Failure::msg("backing store unreachable"));
    info!("turn ran {} task(s)", queue.run_turn());

    // Retry succeeded; reset and mark ready again
    gate.set_state(false);
    gate.register(|failure| info!("late observer sees failure: {:?}", failure.map(|f| f.to_string())));
    gate.set_state(true);
    info!("turn ran {} task(s)", queue.run_until_idle());
    Ok(())
}
