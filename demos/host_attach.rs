use std::{sync::Arc, time::Duration};

use readygate::runtime::{Config, Ready, TokioSpawn, WithReady};
use tracing::*;

#[derive(Debug)]
struct Connection {
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config: Config = match std::env::var("READYGATE_CONFIG") {
        Ok(raw) => serde_json::from_str(&raw)?,
        Err(_) => Config::default().name("primary-db"),
    };
    let conn = Arc::new(WithReady::with_config(
        Connection {
            url: "postgres://localhost/app".into(),
        },
        TokioSpawn::current()?,
        &config,
    ));

    let producer = conn.clone();
    tokio::spawn(async move {
        // Pretend to connect
        tokio::time::sleep(Duration::from_millis(250)).await;
        producer.ready_with(true);
    });

    conn.on_ready(|failure| info!("callback observer notified, failure: {failure:?}"));
    conn.ready().await?;
    info!("connected to {}", conn.url);
    Ok(())
}
