//! In-process collaborators
//!
//! Stand-ins for the positioning provider, map surface and notifier. The
//! binary drives a scripted session with them and the tests use their call
//! logs to assert exactly which collaborator calls a session operation made.

use crate::domain::state::ProviderError;
use crate::domain::types::{
    Bearing, Building, Coordinate, DirectionsRequest, Floor, GroundOverlayOptions, LatLng,
    LocationOptions, MapOptions, MarkerId, MarkerOptions, Placement, Poi, PoiCategory, PolylineId,
    PolylineOptions, Position, Route, RoutePoint,
};
use crate::io::location::{feed_channel, FeedEvent, FeedSender, LocationFeed, LocationSubscription};
use crate::io::notifier::{LoadingId, Notifier};
use crate::io::surfaces::{MapSurface, PoiDirectory, RouteProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tracing::debug;

/// Buffer for the simulated location channel
const FEED_BUFFER: usize = 64;

/// Calls received by `SimulatedProvider`
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    FetchFloors(String),
    FetchPois(String),
    FetchCategories,
    Start(LocationOptions),
    Stop,
    NavigationFeedback(Position),
    RequestNavigationUpdates,
    RemoveNavigationUpdates,
    ClearCache,
    SetCacheMaxAge(Duration),
    GetCacheMaxAge,
    RequestDirections(DirectionsRequest),
}

#[derive(Default)]
struct ProviderState {
    floors: Vec<Floor>,
    pois: Vec<Poi>,
    categories: Vec<PoiCategory>,
    route: Option<Result<Route, ProviderError>>,
    start_error: Option<ProviderError>,
    feedback_error: Option<ProviderError>,
    cache_max_age: Duration,
    feed: Option<FeedSender>,
    calls: Vec<ProviderCall>,
}

/// Positioning provider, POI directory and route provider in one
#[derive(Default)]
pub struct SimulatedProvider {
    state: Mutex<ProviderState>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_floors(self, floors: Vec<Floor>) -> Self {
        self.state.lock().floors = floors;
        self
    }

    pub fn with_pois(self, pois: Vec<Poi>) -> Self {
        self.state.lock().pois = pois;
        self
    }

    pub fn with_categories(self, categories: Vec<PoiCategory>) -> Self {
        self.state.lock().categories = categories;
        self
    }

    /// Fixed directions response. Without one, a straight route is computed.
    pub fn with_route(self, route: Result<Route, ProviderError>) -> Self {
        self.state.lock().route = Some(route);
        self
    }

    pub fn fail_start(&self, error: ProviderError) {
        self.state.lock().start_error = Some(error);
    }

    pub fn fail_navigation_feedback(&self, error: ProviderError) {
        self.state.lock().feedback_error = Some(error);
    }

    pub fn set_pois(&self, pois: Vec<Poi>) {
        self.state.lock().pois = pois;
    }

    /// Push an event to the current subscriber
    /// Returns false when no feed is running
    pub async fn emit(&self, event: FeedEvent) -> bool {
        let feed = self.state.lock().feed.clone();
        match feed {
            Some(feed) => feed.send(event).await,
            None => false,
        }
    }

    /// Push a location with the given coordinate and bearing
    pub async fn emit_location(&self, coordinate: Coordinate, bearing_degrees: f64) -> bool {
        let position = Position {
            coordinate: Some(coordinate),
            accuracy: 2.0,
            bearing: Bearing { degrees: bearing_degrees },
            status_name: "POSITIONING".to_string(),
            ..Default::default()
        };
        self.emit(FeedEvent::Location(position)).await
    }

    /// Drop the producer half, closing the feed from the provider side
    pub fn close_feed(&self) {
        self.state.lock().feed = None;
    }

    pub fn feed_running(&self) -> bool {
        self.state.lock().feed.as_ref().is_some_and(|f| !f.is_cancelled())
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&ProviderCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: ProviderCall) {
        debug!(call = ?call, "simulated_provider_call");
        self.state.lock().calls.push(call);
    }
}

/// Straight three-point route between the request endpoints
fn straight_route(request: &DirectionsRequest) -> Result<Route, ProviderError> {
    let Some(from) = request.from.coordinate else {
        return Err(ProviderError::Rejected("start position has no coordinate".to_string()));
    };
    let to = request.to.coordinate;
    let mid = Coordinate::new((from.latitude + to.latitude) / 2.0, (from.longitude + to.longitude) / 2.0);
    let floor = request.to.floor_identifier.clone();
    Ok(Route {
        points: [from, mid, to]
            .into_iter()
            .map(|coordinate| RoutePoint { coordinate, floor_identifier: floor.clone() })
            .collect(),
    })
}

#[async_trait]
impl LocationFeed for SimulatedProvider {
    async fn start(&self, options: LocationOptions) -> Result<LocationSubscription, ProviderError> {
        self.record(ProviderCall::Start(options));
        let mut state = self.state.lock();
        if let Some(err) = state.start_error.take() {
            return Err(err);
        }
        let (sender, subscription) = feed_channel(FEED_BUFFER);
        state.feed = Some(sender);
        Ok(subscription)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::Stop);
        self.state.lock().feed = None;
        Ok(())
    }

    async fn send_navigation_feedback(&self, position: Position) -> Result<(), ProviderError> {
        self.record(ProviderCall::NavigationFeedback(position));
        match self.state.lock().feedback_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn request_navigation_updates(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::RequestNavigationUpdates);
        Ok(())
    }

    async fn remove_navigation_updates(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::RemoveNavigationUpdates);
        Ok(())
    }

    async fn clear_cache(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::ClearCache);
        Ok(())
    }

    async fn set_cache_max_age(&self, max_age: Duration) -> Result<(), ProviderError> {
        self.record(ProviderCall::SetCacheMaxAge(max_age));
        self.state.lock().cache_max_age = max_age;
        Ok(())
    }

    async fn cache_max_age(&self) -> Result<Duration, ProviderError> {
        self.record(ProviderCall::GetCacheMaxAge);
        Ok(self.state.lock().cache_max_age)
    }
}

#[async_trait]
impl PoiDirectory for SimulatedProvider {
    async fn fetch_floors(&self, building: &Building) -> Result<Vec<Floor>, ProviderError> {
        self.record(ProviderCall::FetchFloors(building.identifier.clone()));
        Ok(self.state.lock().floors.clone())
    }

    async fn fetch_indoor_pois(&self, building: &Building) -> Result<Vec<Poi>, ProviderError> {
        self.record(ProviderCall::FetchPois(building.identifier.clone()));
        Ok(self.state.lock().pois.clone())
    }

    async fn fetch_poi_categories(&self) -> Result<Vec<PoiCategory>, ProviderError> {
        self.record(ProviderCall::FetchCategories);
        Ok(self.state.lock().categories.clone())
    }
}

#[async_trait]
impl RouteProvider for SimulatedProvider {
    async fn request_directions(&self, request: DirectionsRequest) -> Result<Route, ProviderError> {
        let fixed = self.state.lock().route.clone();
        let result = fixed.unwrap_or_else(|| straight_route(&request));
        self.record(ProviderCall::RequestDirections(request));
        result
    }
}

/// Calls received by `SimulatedMap`
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    Create(MapOptions),
    Ready,
    AddGroundOverlay(GroundOverlayOptions),
    AddMarker(MarkerOptions),
    SetMarkerPosition(MarkerId, LatLng),
    RemoveMarker(MarkerId),
    AddPolyline(PolylineOptions),
    RemovePolyline(PolylineId),
}

#[derive(Default)]
struct MapSurfaceState {
    next_id: u64,
    created: bool,
    ready_fired: bool,
    overlay_error: Option<ProviderError>,
    markers: FxHashMap<MarkerId, (MarkerOptions, LatLng)>,
    polylines: FxHashMap<PolylineId, PolylineOptions>,
    calls: Vec<MapCall>,
}

/// Map surface that keeps its drawn objects in memory
#[derive(Default)]
pub struct SimulatedMap {
    state: Mutex<MapSurfaceState>,
}

impl SimulatedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_overlay(&self, error: ProviderError) {
        self.state.lock().overlay_error = Some(error);
    }

    pub fn marker_count(&self) -> usize {
        self.state.lock().markers.len()
    }

    pub fn marker_position(&self, marker: MarkerId) -> Option<LatLng> {
        self.state.lock().markers.get(&marker).map(|(_, position)| *position)
    }

    pub fn marker_options(&self, marker: MarkerId) -> Option<MarkerOptions> {
        self.state.lock().markers.get(&marker).map(|(options, _)| options.clone())
    }

    pub fn polylines(&self) -> Vec<PolylineOptions> {
        self.state.lock().polylines.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.state.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&MapCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| matches(c)).count()
    }

    fn next_id(state: &mut MapSurfaceState) -> u64 {
        state.next_id += 1;
        state.next_id
    }
}

#[async_trait]
impl MapSurface for SimulatedMap {
    async fn create(&self, options: MapOptions) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::Create(options));
        state.created = true;
        state.ready_fired = false;
        Ok(())
    }

    async fn ready(&self) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::Ready);
        if !state.created {
            return Err(ProviderError::Other("map not created".to_string()));
        }
        if state.ready_fired {
            return Err(ProviderError::Other("ready already signalled".to_string()));
        }
        state.ready_fired = true;
        Ok(())
    }

    async fn add_ground_overlay(&self, options: GroundOverlayOptions) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::AddGroundOverlay(options));
        match state.overlay_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn add_marker(&self, options: MarkerOptions) -> Result<MarkerId, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::AddMarker(options.clone()));
        let id = MarkerId(Self::next_id(&mut state));
        let position = options.position;
        state.markers.insert(id, (options, position));
        Ok(id)
    }

    async fn set_marker_position(&self, marker: MarkerId, position: LatLng) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::SetMarkerPosition(marker, position));
        match state.markers.get_mut(&marker) {
            Some(entry) => {
                entry.1 = position;
                Ok(())
            }
            None => Err(ProviderError::Other(format!("unknown marker {}", marker))),
        }
    }

    async fn remove_marker(&self, marker: MarkerId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::RemoveMarker(marker));
        state.markers.remove(&marker);
        Ok(())
    }

    async fn add_polyline(&self, options: PolylineOptions) -> Result<PolylineId, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::AddPolyline(options.clone()));
        let id = PolylineId(Self::next_id(&mut state));
        state.polylines.insert(id, options);
        Ok(id)
    }

    async fn remove_polyline(&self, polyline: PolylineId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MapCall::RemovePolyline(polyline));
        state.polylines.remove(&polyline);
        Ok(())
    }
}

/// Notifier that keeps every message for later inspection
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, Placement)>>,
    loading: Mutex<Vec<(LoadingId, bool)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Loading indicators presented and not yet dismissed
    pub fn open_loading(&self) -> usize {
        self.loading.lock().iter().filter(|(_, dismissed)| !dismissed).count()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, message: &str, placement: Placement) {
        self.messages.lock().push((message.to_string(), placement));
    }

    fn present_loading(&self, _message: &str) -> LoadingId {
        let mut loading = self.loading.lock();
        let id = LoadingId(loading.len() as u64 + 1);
        loading.push((id, false));
        id
    }

    fn dismiss_loading(&self, id: LoadingId) {
        if let Some(entry) = self.loading.lock().iter_mut().find(|(l, _)| *l == id) {
            entry.1 = true;
        }
    }
}

/// Positions walking diagonally across the building bounds
pub fn walk_positions(building: &Building, floor_identifier: &str, steps: usize) -> Vec<Position> {
    let sw = building.bounds.south_west;
    let ne = building.bounds.north_east;
    let steps = steps.max(1);
    (0..steps)
        .map(|i| {
            let t = (i as f64 + 0.5) / steps as f64;
            Position {
                coordinate: Some(Coordinate::new(
                    sw.latitude + (ne.latitude - sw.latitude) * t,
                    sw.longitude + (ne.longitude - sw.longitude) * t,
                )),
                accuracy: 1.5,
                bearing: Bearing { degrees: 45.0 },
                floor_identifier: floor_identifier.to_string(),
                building_identifier: building.identifier.clone(),
                status_name: "POSITIONING".to_string(),
            }
        })
        .collect()
}
