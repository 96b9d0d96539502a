mod config;
mod scene;

use std::time::Duration;

use config::SimConfig;
use mc_vehicle_game::{GameEvent, GameWorld, SimulationSide};
use tracing::{debug, info, trace};

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::TrailerMoved {
            runtime_id,
            position,
            yaw,
            ..
        } => trace!(runtime_id, ?position, yaw, "trailer moved"),
        GameEvent::TrailerDetached {
            trailer_runtime_id,
            reason,
        } => info!(trailer = trailer_runtime_id, ?reason, "trailer detached"),
        GameEvent::SoundPlayed { sound, position } => debug!(?sound, ?position, "sound"),
        other => debug!(?other, "event"),
    }
}

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vehicle.toml".into());
    let config = match SimConfig::load(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let side = if config.simulation.authoritative {
        SimulationSide::Authoritative
    } else {
        SimulationSide::Observer
    };
    info!(
        "mc-vehicle server v{} starting ({:?}, {} ms/tick)",
        env!("CARGO_PKG_VERSION"),
        side,
        config.simulation.tick_ms
    );
    info!(
        "Trailer detach threshold: {}, friction: {}",
        config.vehicle.trailer_detach_threshold, config.vehicle.trailer_friction
    );

    let mut world = GameWorld::with_config(1, config.vehicle.clone(), side);
    if let Err(e) = scene::spawn_scene(&mut world, &config.spawn) {
        eprintln!("Failed to build scene: {e}");
        std::process::exit(1);
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    // Handle Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let max_ticks = config.simulation.max_ticks;
    let mut tick_interval = tokio::time::interval(Duration::from_millis(config.simulation.tick_ms.max(1)));
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                world.tick();
                for event in world.drain_events() {
                    log_event(&event);
                }
                if max_ticks != 0 && world.current_tick() >= max_ticks {
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("Simulation stopped after {} ticks.", world.current_tick());
}
