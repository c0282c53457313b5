//! End-to-end session scenario through the command loop

use indoor_session::domain::types::{Bounds, Building, Coordinate, Floor, Poi, PoiCategory};
use indoor_session::domain::{MapState, NavigationState, OverlayState, PositioningState};
use indoor_session::infra::{Config, Metrics};
use indoor_session::io::simulated::{
    walk_positions, MapCall, ProviderCall, RecordingNotifier, SimulatedMap, SimulatedProvider,
};
use indoor_session::io::{FeedEvent, Journal};
use indoor_session::services::{Collaborators, SessionCommand, SessionController};
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::{mpsc, watch};

fn building() -> Building {
    Building {
        identifier: "1234".to_string(),
        name: "HQ".to_string(),
        bounds: Bounds {
            south_west: Coordinate::new(42.0, -8.0),
            north_east: Coordinate::new(42.001, -7.999),
        },
        center: Coordinate::new(42.0005, -7.9995),
        rotation: 0.0,
    }
}

fn provider() -> SimulatedProvider {
    let pois = (0..3)
        .map(|i| Poi {
            identifier: format!("poi-{}", i),
            name: format!("POI {}", i),
            coordinate: Coordinate::new(42.0009, -8.0 + 0.0003 * (i as f64 + 1.0)),
            floor_identifier: "f0".to_string(),
            category_code: "shop".to_string(),
        })
        .collect();
    SimulatedProvider::new()
        .with_floors(vec![Floor {
            identifier: "f0".to_string(),
            level: 0,
            map_url: "https://maps/f0.png".to_string(),
        }])
        .with_pois(pois)
        .with_categories(vec![PoiCategory {
            code: "shop".to_string(),
            name: "Shop".to_string(),
            icon_selected: Some("https://icons/shop.png".to_string()),
            icon_unselected: None,
        }])
}

#[tokio::test]
async fn test_full_session_walk() {
    let dir = tempdir().unwrap();
    let journal_path = dir.path().join("session.jsonl");

    let provider = Arc::new(provider());
    let map = Arc::new(SimulatedMap::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let metrics = Arc::new(Metrics::new());
    let collaborators = Collaborators {
        feed: provider.clone(),
        map: map.clone(),
        directory: provider.clone(),
        routes: provider.clone(),
        notifier: notifier.clone(),
    };
    let config = Config::default().with_building(building());
    let controller = SessionController::new(
        config,
        collaborators,
        metrics.clone(),
        Journal::new(journal_path.to_str().unwrap()),
    );
    let mut snapshots = controller.subscribe();
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let session = tokio::spawn(controller.run(cmd_rx, shutdown_rx));

    // Positioning before the map exists is refused
    cmd_tx.send(SessionCommand::StartPositioning).await.unwrap();
    cmd_tx.send(SessionCommand::MountMap).await.unwrap();
    cmd_tx.send(SessionCommand::LoadPois).await.unwrap();
    cmd_tx.send(SessionCommand::StartPositioning).await.unwrap();
    snapshots.wait_for(|s| s.positioning == PositioningState::Starting).await.unwrap();

    let snapshot = snapshots.borrow().clone();
    assert_eq!(snapshot.map, MapState::Ready { overlay: OverlayState::Drawn });
    assert_eq!(snapshot.poi_count, Some(3));

    let walk = walk_positions(&building(), "f0", 4);
    let (first, rest) = walk.split_first().unwrap();
    assert!(provider.emit(FeedEvent::Location(first.clone())).await);
    snapshots.wait_for(|s| s.current_position.is_some()).await.unwrap();

    cmd_tx.send(SessionCommand::RequestNavigation).await.unwrap();
    cmd_tx.send(SessionCommand::RequestRoute).await.unwrap();
    snapshots
        .wait_for(|s| s.navigation == NavigationState::On && s.route_points.is_some())
        .await
        .unwrap();
    assert!(!snapshots.borrow().navigation_conditions_not_set());

    for position in rest {
        assert!(provider.emit(FeedEvent::Location(position.clone())).await);
    }
    let last = rest.last().unwrap().clone();
    snapshots.wait_for(|s| s.current_position.as_ref() == Some(&last)).await.unwrap();

    cmd_tx.send(SessionCommand::Leave).await.unwrap();
    session.await.unwrap();

    // Teardown stopped the feed and removed everything tied to it
    assert_eq!(provider.count_calls(|c| *c == ProviderCall::Stop), 1);
    assert_eq!(provider.count_calls(|c| *c == ProviderCall::RemoveNavigationUpdates), 1);
    assert!(!provider.feed_running());
    assert!(map.polylines().is_empty());
    assert_eq!(map.marker_count(), 3);
    assert_eq!(map.count_calls(|c| matches!(c, MapCall::AddPolyline(_))), 1);

    let final_snapshot = snapshots.borrow().clone();
    assert_eq!(final_snapshot.positioning, PositioningState::Idle);
    assert_eq!(final_snapshot.navigation, NavigationState::Off);
    assert!(final_snapshot.route_points.is_none());

    assert_eq!(
        notifier.messages(),
        vec!["The map must be visible in order to launch the positioning".to_string()]
    );
    assert_eq!(metrics.location_events_total(), 4);
    assert_eq!(metrics.routes_total(), 1);

    let journal = std::fs::read_to_string(&journal_path).unwrap();
    let events: Vec<String> = journal
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["event"].to_string())
        .collect();
    assert_eq!(events.first().map(String::as_str), Some("\"session_started\""));
    assert_eq!(events.last().map(String::as_str), Some("\"session_ended\""));
    assert!(events.iter().any(|e| e == "\"route_drawn\""));
}
