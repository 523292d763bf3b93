//! Simulation engine binary for Steading.
//!
//! This is the main entry point that wires together the tick scheduler,
//! the `PostgreSQL` settlement store, and NATS event fan-out. It loads
//! configuration, starts the scheduler, bridges control messages from
//! the game servers to the scheduler's control surface, and republishes
//! bus events on per-world NATS subjects.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `steading-config.yaml`
//! 3. Connect the `PostgreSQL` settlement store
//! 4. Create the event bus and the scheduler
//! 5. Connect to NATS
//! 6. Spawn the event forwarder (bus -> `steading.events.<world>.<kind>`)
//! 7. Spawn the control listener (`steading.control.join` / `.leave`)
//! 8. Start the tick loop and run until SIGINT

mod error;

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt as _;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use steading_core::{EventBus, Scheduler, SimulationConfig};
use steading_store::{PgStore, PostgresPool};
use steading_types::{PlayerId, WorldId};

use crate::error::EngineError;

/// Subject the engine listens on for scheduler control messages.
const CONTROL_SUBJECT: &str = "steading.control.>";

/// Control message sent by game servers on world join/leave.
#[derive(Debug, Deserialize)]
struct ControlPayload {
    /// The player joining or leaving.
    player_id: PlayerId,
    /// The world concerned (ignored for `leave`).
    world_id: WorldId,
}

/// Application entry point for the simulation engine.
///
/// Initializes all subsystems and runs until interrupted.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("steading-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    config.scheduler.validate()?;
    info!(
        tick_rate = config.scheduler.tick_rate,
        coarse_period_ticks = config.scheduler.coarse_period(),
        population_period_ticks = config.scheduler.population_period_ticks,
        batch_size = config.scheduler.batch_size,
        "Configuration loaded"
    );

    // 3. Connect the settlement store.
    let pool = PostgresPool::connect_url(&config.infrastructure.postgres_url)
        .await
        .map_err(EngineError::from)?;
    let store = Arc::new(PgStore::new(&pool));
    info!("Settlement store connected");

    // 4. Create the event bus and the scheduler.
    let bus = Arc::new(EventBus::new());
    let scheduler = Arc::new(Scheduler::new(
        store,
        Arc::clone(&bus),
        config.scheduler.clone(),
        config.rates.clone(),
    )?);

    // 5. Connect to NATS.
    let nats_url = &config.infrastructure.nats_url;
    info!(nats_url, "Connecting to NATS");
    let nats = async_nats::connect(nats_url)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("{e}"),
        })?;
    info!("NATS connected");

    // 6. Forward bus events to per-world NATS subjects.
    spawn_event_forwarder(&bus, nats.clone());

    // 7. Bridge control messages to the scheduler control surface.
    spawn_control_listener(&nats, Arc::clone(&scheduler)).await?;

    // 8. Run until interrupted.
    scheduler.start().await;
    info!("Scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    scheduler.stop().await;
    pool.close().await;

    let status = scheduler.status().await;
    info!(
        final_tick = status.current_tick,
        "steading-engine shutdown complete"
    );
    Ok(())
}

/// Load the simulation configuration from `steading-config.yaml`.
///
/// Looks for the config file relative to the current working directory
/// and falls back to defaults when it does not exist.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new("steading-config.yaml");
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}

/// Spawn the task that republishes bus events to NATS.
///
/// Every event goes out on `steading.events.<world_id>.<kind>` so game
/// servers can subscribe per world (or per event kind) with subject
/// wildcards. A lagged forwarder skips to the newest events rather than
/// stalling the bus.
fn spawn_event_forwarder(bus: &EventBus, nats: async_nats::Client) {
    let mut firehose = bus.subscribe_all();
    tokio::spawn(async move {
        loop {
            match firehose.recv().await {
                Ok(event) => {
                    let subject =
                        format!("steading.events.{}.{}", event.world_id, event.kind());
                    match serde_json::to_vec(&event) {
                        Ok(payload) => {
                            if let Err(error) = nats.publish(subject, payload.into()).await {
                                warn!(%error, "Failed to publish event to NATS");
                            }
                        }
                        Err(error) => {
                            warn!(%error, "Failed to serialize event");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event forwarder lagged; skipping to newest");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("Event forwarder stopped");
    });
}

/// Subscribe to control subjects and bridge them to the scheduler.
///
/// `steading.control.join` registers every settlement the player owns;
/// `steading.control.leave` unregisters them. Malformed messages are
/// logged and dropped -- a bad control message must never take the
/// scheduler down.
async fn spawn_control_listener(
    nats: &async_nats::Client,
    scheduler: Arc<Scheduler<PgStore>>,
) -> Result<(), EngineError> {
    let mut subscription = nats
        .subscribe(CONTROL_SUBJECT)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("{e}"),
        })?;

    tokio::spawn(async move {
        while let Some(message) = subscription.next().await {
            let action = message.subject.rsplit('.').next().unwrap_or_default();

            let payload = match serde_json::from_slice::<ControlPayload>(&message.payload) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(subject = %message.subject, %error, "Malformed control message");
                    continue;
                }
            };

            match action {
                "join" => {
                    match scheduler
                        .register_owned(payload.player_id, payload.world_id)
                        .await
                    {
                        Ok(added) => {
                            info!(player_id = %payload.player_id, added, "Player joined");
                        }
                        Err(error) => {
                            warn!(player_id = %payload.player_id, %error, "Join failed");
                        }
                    }
                }
                "leave" => {
                    let removed = scheduler.unregister_owned(payload.player_id).await;
                    info!(player_id = %payload.player_id, removed, "Player left");
                }
                other => {
                    warn!(action = other, "Unknown control action");
                }
            }
        }
        info!("Control listener stopped");
    });

    Ok(())
}
