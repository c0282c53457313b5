//! Indoor session - scripted positioning session against simulated providers
//!
//! Drives one building view end to end: map, POIs, positioning, navigation
//! and a route, with a simulated walk feeding the location subscription.
//!
//! Module structure:
//! - `domain/` - Session state, guards and shared types
//! - `io/` - Collaborator interfaces, simulated providers, journal
//! - `services/` - SessionController
//! - `infra/` - Config, Metrics

use clap::Parser;
use indoor_session::domain::types::{Building, Coordinate, Floor, Poi, PoiCategory};
use indoor_session::domain::PositioningState;
use indoor_session::infra::{CliArgs, Config, Metrics};
use indoor_session::io::simulated::{walk_positions, SimulatedMap, SimulatedProvider};
use indoor_session::io::{FeedEvent, Journal, LogNotifier};
use indoor_session::services::{Collaborators, SessionCommand, SessionController};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

fn demo_floors(building: &Building) -> Vec<Floor> {
    vec![
        Floor {
            identifier: format!("{}-f0", building.identifier),
            level: 0,
            map_url: format!("https://maps.example/{}/0.png", building.identifier),
        },
        Floor {
            identifier: format!("{}-f1", building.identifier),
            level: 1,
            map_url: format!("https://maps.example/{}/1.png", building.identifier),
        },
    ]
}

/// POIs spread along the building's north edge
fn demo_pois(building: &Building, floor: &str) -> Vec<Poi> {
    let sw = building.bounds.south_west;
    let ne = building.bounds.north_east;
    [("entrance", "Entrance", "access"), ("cafe", "Cafeteria", "food"), ("wc", "Toilets", "wc")]
        .iter()
        .enumerate()
        .map(|(i, (id, name, code))| {
            let t = (i as f64 + 1.0) / 4.0;
            Poi {
                identifier: id.to_string(),
                name: name.to_string(),
                coordinate: Coordinate::new(
                    ne.latitude - (ne.latitude - sw.latitude) * 0.1,
                    sw.longitude + (ne.longitude - sw.longitude) * t,
                ),
                floor_identifier: floor.to_string(),
                category_code: code.to_string(),
            }
        })
        .collect()
}

fn demo_categories() -> Vec<PoiCategory> {
    ["access", "food", "wc"]
        .iter()
        .map(|code| PoiCategory {
            code: code.to_string(),
            name: code.to_uppercase(),
            icon_selected: Some(format!("https://icons.example/{}_selected.png", code)),
            icon_unselected: Some(format!("https://icons.example/{}.png", code)),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // LOG_FORMAT=json switches to one JSON object per line
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), git = env!("GIT_HASH"), "indoor-session starting");

    let args = CliArgs::parse();
    let config = Config::load_from_path(&args.config);
    let building = config.building().clone();

    info!(
        config_file = %config.config_file(),
        building = %building.identifier,
        zoom = %config.map_zoom(),
        target_poi_index = %config.target_poi_index(),
        cache_max_age_secs = %config.cache_max_age().as_secs(),
        journal = %config.journal_enabled(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());
    let journal = if config.journal_enabled() {
        Journal::new(config.journal_file())
    } else {
        Journal::disabled()
    };

    // Simulated providers seeded for the configured building
    let floors = demo_floors(&building);
    let ground_floor = floors[0].identifier.clone();
    let provider = Arc::new(
        SimulatedProvider::new()
            .with_pois(demo_pois(&building, &ground_floor))
            .with_floors(floors)
            .with_categories(demo_categories()),
    );
    let collaborators = Collaborators {
        feed: provider.clone(),
        map: Arc::new(SimulatedMap::new()),
        directory: provider.clone(),
        routes: provider.clone(),
        notifier: Arc::new(LogNotifier::new(config.notifier_duration_ms())),
    };

    let controller = SessionController::new(config.clone(), collaborators, metrics.clone(), journal);
    let snapshots = controller.subscribe();

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Simulated walk: emits once positioning has been requested
    let walk = walk_positions(&building, &ground_floor, config.simulation_steps());
    let walk_provider = provider.clone();
    let mut walk_snapshots = snapshots.clone();
    let update_interval = Duration::from_millis(config.simulation_update_interval_ms());
    let walker = tokio::spawn(async move {
        if walk_snapshots.wait_for(|s| s.positioning != PositioningState::Idle).await.is_err() {
            return;
        }
        let mut interval = tokio::time::interval(update_interval);
        for position in walk {
            interval.tick().await;
            if !walk_provider.emit(FeedEvent::Location(position)).await {
                debug!("walk_emit_skipped");
            }
        }
        info!("walk_finished");
    });

    // Scripted UI: the same sequence a user would tap through
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let script_snapshots = snapshots.clone();
    let cache_max_age = config.cache_max_age();
    tokio::spawn(async move {
        if let Err(e) = run_script(cmd_tx, script_snapshots, walker, cache_max_age).await {
            warn!(error = %e, "script_aborted");
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Run session - consumes commands until leave, close or shutdown
    controller.run(cmd_rx, shutdown_rx).await;

    let last = snapshots.borrow().clone();
    info!(
        map = %last.map.as_str(),
        positioning = %last.positioning.as_str(),
        route_points = ?last.route_points,
        "session_summary"
    );
    metrics.report().log();
    info!("indoor-session shutdown complete");
    Ok(())
}

async fn run_script(
    cmd_tx: mpsc::Sender<SessionCommand>,
    mut snapshots: watch::Receiver<indoor_session::domain::SessionSnapshot>,
    walker: tokio::task::JoinHandle<()>,
    cache_max_age: Duration,
) -> anyhow::Result<()> {
    cmd_tx.send(SessionCommand::MountMap).await?;
    cmd_tx.send(SessionCommand::LoadPois).await?;
    cmd_tx.send(SessionCommand::SetCacheMaxAge(cache_max_age)).await?;

    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx.send(SessionCommand::GetCacheMaxAge(reply_tx)).await?;
    if let Ok(max_age) = reply_rx.await? {
        info!(max_age_secs = %max_age.as_secs(), "script_cache_checked");
    }

    cmd_tx.send(SessionCommand::StartPositioning).await?;
    snapshots.wait_for(|s| s.current_position.is_some()).await?;

    cmd_tx.send(SessionCommand::RequestNavigation).await?;
    cmd_tx.send(SessionCommand::ToggleAccessible).await?;
    cmd_tx.send(SessionCommand::RequestRoute).await?;

    walker.await?;
    cmd_tx.send(SessionCommand::RemoveNavigation).await?;
    cmd_tx.send(SessionCommand::StopPositioning).await?;
    cmd_tx.send(SessionCommand::Leave).await?;
    Ok(())
}
