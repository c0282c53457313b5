//! Map surface, POI directory and route provider interfaces

use crate::domain::state::ProviderError;
use crate::domain::types::{
    Building, DirectionsRequest, Floor, GroundOverlayOptions, LatLng, MapOptions, MarkerId,
    MarkerOptions, Poi, PoiCategory, PolylineId, PolylineOptions, Route,
};
use async_trait::async_trait;

/// Rendering surface for the floor map
#[async_trait]
pub trait MapSurface: Send + Sync {
    /// Create the map centered per `options`
    async fn create(&self, options: MapOptions) -> Result<(), ProviderError>;

    /// One-shot readiness signal. Resolves once per created map.
    async fn ready(&self) -> Result<(), ProviderError>;

    async fn add_ground_overlay(&self, options: GroundOverlayOptions) -> Result<(), ProviderError>;

    async fn add_marker(&self, options: MarkerOptions) -> Result<MarkerId, ProviderError>;

    async fn set_marker_position(&self, marker: MarkerId, position: LatLng) -> Result<(), ProviderError>;

    async fn remove_marker(&self, marker: MarkerId) -> Result<(), ProviderError>;

    async fn add_polyline(&self, options: PolylineOptions) -> Result<PolylineId, ProviderError>;

    async fn remove_polyline(&self, polyline: PolylineId) -> Result<(), ProviderError>;
}

/// Building cartography: floors, POIs and POI categories
#[async_trait]
pub trait PoiDirectory: Send + Sync {
    async fn fetch_floors(&self, building: &Building) -> Result<Vec<Floor>, ProviderError>;

    async fn fetch_indoor_pois(&self, building: &Building) -> Result<Vec<Poi>, ProviderError>;

    async fn fetch_poi_categories(&self) -> Result<Vec<PoiCategory>, ProviderError>;
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn request_directions(&self, request: DirectionsRequest) -> Result<Route, ProviderError>;
}
