//! `livestock-sync`: tails the event stream of a farm-management server.
//!
//! Connects to the configured endpoint, logs every decoded event and every
//! connection state change, and runs until Ctrl-C.
//!
//! ```bash
//! LIVESTOCK_SYNC__CLIENT__URL=ws://localhost:5000 livestock-sync
//! livestock-sync ws://farm.example:5000/events
//! ```

use livestock_sync::config::AppConfig;
use livestock_sync::{EventCallbacks, SyncClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let filter = config.telemetry.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    if config.telemetry.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let url = std::env::args().nth(1);
    let client = SyncClient::websocket(url.as_deref())?;
    info!(client_id = %client.id(), url = %client.config().url, "starting event tail");

    let binding = client.bind(
        EventCallbacks::named("tail")
            .on_entity_added(|entity| info!(entity = %entity, "animal added"))
            .on_entity_updated(|entity| info!(entity = %entity, "animal updated"))
            .on_entity_deleted(|id| info!(id = %id, "animal deleted"))
            .on_batch_updated(|batch| {
                info!(
                    count = batch.ids.len(),
                    fields = batch.updates.len(),
                    "animals batch updated"
                )
            })
            .on_snapshot_replaced(|entities| info!(count = entities.len(), "herd snapshot replaced")),
    )?;

    let mut states = client.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            info!(state = %state, "connection state");
        }
    });

    tokio::signal::ctrl_c().await?;
    warn!("interrupted, shutting down");

    binding.teardown();
    client.disconnect();
    Ok(())
}
