//! Operation and feed handlers for the SessionController
//!
//! Each operation runs its guard first and only then talks to a
//! collaborator. State is published once the operation settles.

use super::markers::{
    map_options, overlay_options, poi_marker_options, position_marker_options,
    resolve_categories, route_polyline_options,
};
use super::SessionController;
use crate::domain::session::{Admission, Operation, MSG_NO_POIS, MSG_ROUTE_CONDITIONS};
use crate::domain::state::{
    MapState, NavigationState, OverlayState, PositioningState, ProviderError, SessionError,
};
use crate::domain::types::{DirectionsOptions, DirectionsRequest, Position};
use crate::io::location::FeedEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const LOADING_MAP_MESSAGE: &str = "Loading map...";
const POSITIONING_NOT_ENABLED: &str = "Position listener is not enabled.";

impl SessionController {
    /// Fetch floors, create the map and draw the first floor's plan.
    ///
    /// Only runs from `Unloaded`. An overlay failure leaves the map usable
    /// (`Ready { Failed }`); anything earlier returns to `Unloaded`.
    pub async fn mount_map(&mut self) -> Result<(), SessionError> {
        let op = Operation::MountMap;
        if self.admit(op)? == Admission::Skip {
            debug!(session = %self.session.id, map = %self.session.map.as_str(), "mount_map_skipped");
            return Ok(());
        }

        let loading = self.notifier.present_loading(LOADING_MAP_MESSAGE);
        self.session.map = MapState::Loading;
        self.refresh();

        if let Err(e) = self.prepare_surface().await {
            self.notifier.dismiss_loading(loading);
            self.session.floors.clear();
            self.session.current_floor = None;
            self.session.map = MapState::Unloaded;
            self.refresh();
            return Err(self.report(op.as_str(), e.into()));
        }

        self.session.map = MapState::Ready { overlay: OverlayState::Pending };
        self.refresh();

        let overlay = self.draw_floor_overlay().await;
        self.notifier.dismiss_loading(loading);
        let floor = self.session.current_floor.as_ref().map(|f| f.identifier.clone()).unwrap_or_default();

        match overlay {
            Ok(()) => {
                self.session.map = MapState::Ready { overlay: OverlayState::Drawn };
                self.refresh();
                info!(
                    session = %self.session.id,
                    floor = %floor,
                    floors = %self.session.floors.len(),
                    "map_mounted"
                );
                self.journal_event("map_mounted", None);
                Ok(())
            }
            Err(e) => {
                self.session.map = MapState::Ready { overlay: OverlayState::Failed };
                self.refresh();
                warn!(session = %self.session.id, floor = %floor, "map_mounted_without_overlay");
                Err(self.report(op.as_str(), e.into()))
            }
        }
    }

    /// Floors, map creation and the one-shot ready signal
    async fn prepare_surface(&mut self) -> Result<(), ProviderError> {
        let floors = self.directory.fetch_floors(&self.session.building).await?;
        self.session.current_floor = floors.first().cloned();
        self.session.floors = floors;

        self.map.create(map_options(&self.session.building, self.config.map_zoom())).await?;
        self.map.ready().await
    }

    async fn draw_floor_overlay(&self) -> Result<(), ProviderError> {
        let Some(floor) = self.session.current_floor.as_ref() else {
            return Err(ProviderError::Rejected("building has no floors".to_string()));
        };
        self.map.add_ground_overlay(overlay_options(&self.session.building, floor)).await
    }

    /// Fetch the building's POIs and categories and place one marker per POI.
    ///
    /// Reloading replaces the previous markers.
    pub async fn load_pois(&mut self) -> Result<(), SessionError> {
        let op = Operation::LoadPois;
        self.admit(op)?;

        let pois = self
            .directory
            .fetch_indoor_pois(&self.session.building)
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        if pois.is_empty() {
            self.clear_poi_markers().await;
            self.clear_route().await;
            self.session.pois = Some(pois);
            self.session.poi_categories = None;
            self.refresh();
            return Err(self.report(op.as_str(), SessionError::precondition(MSG_NO_POIS)));
        }

        let categories = self
            .directory
            .fetch_poi_categories()
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        self.clear_poi_markers().await;

        let icon_size = self.config.marker_icon_size();
        let mut placed = Vec::with_capacity(pois.len());
        let mut failure = None;
        for (poi, category) in resolve_categories(&pois, &categories) {
            match self.map.add_marker(poi_marker_options(poi, category, icon_size)).await {
                Ok(marker) => placed.push(marker),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let count = pois.len();
        self.metrics.record_poi_markers(placed.len() as u64);
        self.session.poi_markers = placed;
        self.session.pois = Some(pois);
        self.session.poi_categories = Some(categories);
        self.refresh();

        if let Some(e) = failure {
            return Err(self.report(op.as_str(), e.into()));
        }

        info!(
            session = %self.session.id,
            pois = %count,
            categories = %self.session.poi_categories.as_ref().map_or(0, Vec::len),
            "pois_loaded"
        );
        self.journal_event("pois_loaded", None);
        Ok(())
    }

    /// Place the tracking marker and register with the location feed
    pub async fn start_positioning(&mut self) -> Result<(), SessionError> {
        let op = Operation::StartPositioning;
        self.admit(op)?;

        let marker = self
            .map
            .add_marker(position_marker_options(self.config.position_marker_title()))
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        self.session.current_marker = Some(marker);
        self.session.positioning = PositioningState::Starting;
        self.refresh();

        let options = self.config.location_options(&self.session.building);
        match self.feed.start(options).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                info!(
                    session = %self.session.id,
                    building = %self.session.building.identifier,
                    marker = %marker,
                    "positioning_started"
                );
                self.journal_event("positioning_started", None);
                Ok(())
            }
            Err(e) => {
                self.release_positioning().await;
                Err(self.report(op.as_str(), e.into()))
            }
        }
    }

    /// Stop the feed and remove everything that depends on it.
    ///
    /// Navigation is turned off first and the route is cleared.
    pub async fn stop_positioning(&mut self) -> Result<(), SessionError> {
        let op = Operation::StopPositioning;
        if self.admit(op)? == Admission::Skip {
            info!(session = %self.session.id, reason = POSITIONING_NOT_ENABLED, "stop_positioning_skipped");
            return Ok(());
        }

        self.release_navigation().await;
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        let stopped = self.feed.stop().await;
        self.release_positioning().await;

        info!(session = %self.session.id, "positioning_stopped");
        self.journal_event("positioning_stopped", None);
        stopped.map_err(|e| self.report(op.as_str(), e.into()))
    }

    /// Local teardown shared by stop, failed registration and feed close
    async fn release_positioning(&mut self) {
        self.release_navigation().await;
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.session.current_position = None;
        self.clear_route().await;
        if let Some(marker) = self.session.current_marker.take() {
            if let Err(e) = self.map.remove_marker(marker).await {
                warn!(session = %self.session.id, marker = %marker, error = %e, "position_marker_remove_failed");
            }
        }
        self.session.positioning = PositioningState::Idle;
        self.refresh();
    }

    /// Deregister navigation updates at the provider, if registered
    async fn release_navigation(&mut self) {
        if !self.session.navigating() {
            return;
        }
        if let Err(e) = self.feed.remove_navigation_updates().await {
            warn!(session = %self.session.id, error = %e, "navigation_remove_failed");
        }
        self.session.navigation = NavigationState::Off;
        info!(session = %self.session.id, "navigation_stopped");
    }

    pub async fn request_navigation(&mut self) -> Result<(), SessionError> {
        let op = Operation::RequestNavigation;
        self.admit(op)?;

        self.feed
            .request_navigation_updates()
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        self.session.navigation = NavigationState::On;
        self.refresh();
        info!(session = %self.session.id, "navigation_started");
        self.journal_event("navigation_started", None);
        Ok(())
    }

    pub async fn remove_navigation(&mut self) -> Result<(), SessionError> {
        let op = Operation::RemoveNavigation;
        self.admit(op)?;

        self.feed
            .remove_navigation_updates()
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        self.session.navigation = NavigationState::Off;
        self.refresh();
        info!(session = %self.session.id, "navigation_stopped");
        self.journal_event("navigation_stopped", None);
        Ok(())
    }

    /// Ask for directions from the live position to the configured target POI
    /// and draw them, replacing any previous route.
    pub async fn request_route(&mut self) -> Result<(), SessionError> {
        let op = Operation::RequestRoute;
        self.admit(op)?;

        let index = self.config.target_poi_index();
        let Some(target) = self.session.pois.as_ref().and_then(|pois| pois.get(index)).cloned() else {
            let reason = format!("There is no POI at index {} to route to", index);
            return Err(self.report(op.as_str(), SessionError::Precondition(reason)));
        };
        let Some(from) = self.session.current_position.clone() else {
            return Err(self.report(op.as_str(), SessionError::precondition(MSG_ROUTE_CONDITIONS)));
        };

        let target_name = target.name.clone();
        let request = DirectionsRequest {
            building: self.session.building.clone(),
            options: DirectionsOptions {
                accessible: self.session.accessible,
                starting_angle: from.bearing.degrees,
            },
            from,
            to: target,
        };

        let route = self
            .routes
            .request_directions(request)
            .await
            .map_err(|e| self.report(op.as_str(), e.into()))?;

        self.clear_route().await;
        let polyline = self
            .map
            .add_polyline(route_polyline_options(&route, self.config.route_color(), self.config.route_width()))
            .await;
        let points = route.points.len();
        self.session.route = Some(route);

        match polyline {
            Ok(id) => self.session.route_polyline = Some(id),
            Err(e) => {
                self.refresh();
                return Err(self.report(op.as_str(), e.into()));
            }
        }

        self.metrics.record_route();
        self.refresh();
        info!(
            session = %self.session.id,
            target = %target_name,
            points = %points,
            accessible = %self.session.accessible,
            "route_drawn"
        );
        self.journal_event("route_drawn", Some(target_name.as_str()));
        Ok(())
    }

    /// Flip the accessible-route preference used by later route requests
    pub fn toggle_accessible(&mut self) {
        self.session.accessible = !self.session.accessible;
        self.refresh();
        info!(session = %self.session.id, accessible = %self.session.accessible, "accessible_toggled");
    }

    pub async fn clear_cache(&mut self) -> Result<(), SessionError> {
        self.feed.clear_cache().await.map_err(|e| self.report("clear_cache", e.into()))?;
        info!(session = %self.session.id, "cache_cleared");
        Ok(())
    }

    pub async fn set_cache_max_age(&mut self, max_age: Duration) -> Result<(), SessionError> {
        self.feed
            .set_cache_max_age(max_age)
            .await
            .map_err(|e| self.report("set_cache_max_age", e.into()))?;
        info!(session = %self.session.id, max_age_secs = %max_age.as_secs(), "cache_max_age_set");
        Ok(())
    }

    pub async fn cache_max_age(&mut self) -> Result<Duration, SessionError> {
        let max_age = self
            .feed
            .cache_max_age()
            .await
            .map_err(|e| self.report("cache_max_age", e.into()))?;
        info!(session = %self.session.id, max_age_secs = %max_age.as_secs(), "cache_max_age");
        Ok(max_age)
    }

    /// View teardown: positioning never outlives the session
    pub async fn leave(&mut self) {
        let _ = self.stop_positioning().await;
        info!(session = %self.session.id, "session_ended");
        self.journal_event("session_ended", None);
    }

    /// Absorb one item from the location subscription. `None` means the feed ended.
    pub(crate) async fn handle_feed_event(&mut self, event: Option<FeedEvent>) {
        match event {
            Some(FeedEvent::Location(position)) => self.handle_location(position).await,
            Some(FeedEvent::Error(e)) => self.handle_feed_error(e).await,
            None => {
                self.subscription = None;
                if self.session.positioning != PositioningState::Idle {
                    warn!(session = %self.session.id, "location_feed_closed");
                    self.release_positioning().await;
                    self.journal_event("positioning_stopped", Some("feed closed"));
                }
            }
        }
    }

    async fn handle_feed_error(&mut self, e: ProviderError) {
        match self.session.positioning {
            PositioningState::Idle => {
                debug!(session = %self.session.id, error = %e, "stale_feed_error_ignored");
            }
            PositioningState::Starting => {
                // Registration never produced a location
                error!(session = %self.session.id, error = %e, "positioning_registration_failed");
                self.release_positioning().await;
                let _ = self.report(Operation::StartPositioning.as_str(), e.into());
            }
            PositioningState::Active => {
                let _ = self.report("location_feed", e.into());
            }
        }
    }

    /// Store the position, forward it to navigation and move the marker.
    ///
    /// The first event acknowledges the feed (`Starting` -> `Active`) even when
    /// it carries no coordinate; such events are otherwise dropped.
    pub(crate) async fn handle_location(&mut self, position: Position) {
        if self.session.positioning == PositioningState::Idle {
            debug!(session = %self.session.id, "stale_location_ignored");
            return;
        }

        let started = Instant::now();
        let acknowledged = self.session.positioning == PositioningState::Starting;
        if acknowledged {
            self.session.positioning = PositioningState::Active;
            info!(session = %self.session.id, "positioning_active");
            self.journal_event("positioning_active", None);
        }

        let Some(lat_lng) = position.lat_lng() else {
            self.metrics.record_location_dropped();
            debug!(session = %self.session.id, status = %position.status_name, "location_dropped");
            if acknowledged {
                self.refresh();
            }
            return;
        };

        self.session.current_position = Some(position.clone());

        if self.session.navigating() {
            self.send_navigation_feedback(position);
        }

        if let Some(marker) = self.session.current_marker {
            if let Err(e) = self.map.set_marker_position(marker, lat_lng).await {
                self.metrics.record_provider_error();
                warn!(session = %self.session.id, marker = %marker, error = %e, "position_marker_move_failed");
            }
        }

        self.refresh();
        self.metrics.record_location_event(started.elapsed().as_micros() as u64);
    }

    /// Fire-and-forget: failures are logged and counted, never surfaced
    fn send_navigation_feedback(&self, position: Position) {
        let feed = Arc::clone(&self.feed);
        let metrics = Arc::clone(&self.metrics);
        let session = self.session.id.clone();
        tokio::spawn(async move {
            match feed.send_navigation_feedback(position).await {
                Ok(()) => metrics.record_nav_feedback(true),
                Err(e) => {
                    metrics.record_nav_feedback(false);
                    warn!(session = %session, error = %e, "navigation_feedback_failed");
                }
            }
        });
    }

    async fn clear_poi_markers(&mut self) {
        for marker in std::mem::take(&mut self.session.poi_markers) {
            if let Err(e) = self.map.remove_marker(marker).await {
                warn!(session = %self.session.id, marker = %marker, error = %e, "poi_marker_remove_failed");
            }
        }
    }

    async fn clear_route(&mut self) {
        self.session.route = None;
        if let Some(polyline) = self.session.route_polyline.take() {
            if let Err(e) = self.map.remove_polyline(polyline).await {
                warn!(session = %self.session.id, polyline = %polyline, error = %e, "route_remove_failed");
            }
        }
    }
}
