use std::time::Duration;

use readygate::{
    runtime::{Config, ReadyEmitter, TokioSpawn},
    Failure,
};
use tracing::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let emitter = ReadyEmitter::with_config(TokioSpawn::current()?, &Config::default().name("upstream"));
    let mut events = emitter.subscribe();

    let listener = tokio::spawn(async move {
        // Ends once the emitter and every pending event are gone
        while let Ok(event) = events.recv().await {
            info!("upstream became ready (cycle {})", event.cycle);
        }
    });

    // Flap a few times: only successful transitions become events
    emitter.set_state(true);
    emitter.set_state(false);
    emitter.set_state(Failure::msg("health check failed"));
    emitter.set_state(true);
    emitter.set_state(true);
    emitter.wait().await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(emitter);
    listener.await?;
    Ok(())
}
