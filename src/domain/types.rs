//! Shared types for the indoor session core

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Newtype wrapper for marker handles issued by the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for polyline handles issued by the map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PolylineId(pub u64);

impl std::fmt::Display for PolylineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic coordinate as reported by the positioning provider
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Coordinate in the shape the map surface expects
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Sentinel origin used for the tracking marker before the first fix
    pub const ORIGIN: LatLng = LatLng { lat: 0.0, lng: 0.0 };
}

impl From<Coordinate> for LatLng {
    #[inline]
    fn from(c: Coordinate) -> Self {
        Self { lat: c.latitude, lng: c.longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    /// Corners in overlay order: southwest first, northeast second
    pub fn corners(&self) -> [LatLng; 2] {
        [self.south_west.into(), self.north_east.into()]
    }
}

/// Building the session is bound to. Immutable for the session lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    pub bounds: Bounds,
    pub center: Coordinate,
    /// Rotation in radians
    #[serde(default)]
    pub rotation: f64,
}

impl Building {
    /// Overlay bearing in degrees derived from the building rotation
    #[inline]
    pub fn bearing_degrees(&self) -> f64 {
        self.rotation * 180.0 / PI
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub identifier: String,
    #[serde(default)]
    pub level: i32,
    pub map_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bearing {
    pub degrees: f64,
}

/// A single report from the location feed.
///
/// Providers may emit partial payloads; `coordinate` is optional and events
/// without one are dropped by the session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub bearing: Bearing,
    #[serde(default)]
    pub floor_identifier: String,
    #[serde(default)]
    pub building_identifier: String,
    #[serde(default)]
    pub status_name: String,
}

impl Position {
    /// Map coordinate for this position, if the provider supplied one
    #[inline]
    pub fn lat_lng(&self) -> Option<LatLng> {
        self.coordinate.map(LatLng::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub identifier: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub floor_identifier: String,
    /// Category code, resolved against `PoiCategory::code`
    pub category_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiCategory {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub icon_selected: Option<String>,
    #[serde(default)]
    pub icon_unselected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub coordinate: Coordinate,
    #[serde(default)]
    pub floor_identifier: String,
}

/// Ordered sequence of points between the current position and a target
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    pub points: Vec<RoutePoint>,
}

impl Route {
    /// Polyline vertices in route order
    pub fn path(&self) -> Vec<LatLng> {
        self.points.iter().map(|p| p.coordinate.into()).collect()
    }
}

// Payloads handed to collaborators

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub target: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundOverlayOptions {
    pub url: String,
    pub bounds: [LatLng; 2],
    pub bearing: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub title: String,
    pub icon: Option<MarkerIcon>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineOptions {
    pub points: Vec<LatLng>,
    pub color: String,
    pub width: u32,
}

/// Outdoor positioning parameters nested in the location options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutdoorLocationOptions {
    pub continuous_mode: bool,
    pub user_defined_threshold: bool,
    pub burst_interval: u32,
    pub average_snr_threshold: f64,
}

impl Default for OutdoorLocationOptions {
    fn default() -> Self {
        Self {
            continuous_mode: true,
            user_defined_threshold: false,
            burst_interval: 1,
            average_snr_threshold: 25.0,
        }
    }
}

/// Location request sent when positioning starts.
///
/// Built by merging the configured defaults with the session's building.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationOptions {
    pub building_identifier: String,
    pub use_dead_reckoning: bool,
    pub interval_ms: u64,
    pub indoor_provider: String,
    pub use_ble: bool,
    pub use_wifi: bool,
    pub motion_mode: String,
    pub use_foreground_service: bool,
    pub outdoor: OutdoorLocationOptions,
    pub beacon_filters: Vec<String>,
    pub smallest_displacement: f64,
    pub realtime_update_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionsOptions {
    pub accessible: bool,
    pub starting_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsRequest {
    pub building: Building,
    pub from: Position,
    pub to: Poi,
    pub options: DirectionsOptions,
}

/// Where a transient notification is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Top,
    Middle,
    #[default]
    Bottom,
}

impl Placement {
    pub fn as_str(&self) -> &str {
        match self {
            Placement::Top => "top",
            Placement::Middle => "middle",
            Placement::Bottom => "bottom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn building(rotation: f64) -> Building {
        Building {
            identifier: "b1".to_string(),
            name: String::new(),
            bounds: Bounds {
                south_west: Coordinate::new(1.0, 1.0),
                north_east: Coordinate::new(2.0, 2.0),
            },
            center: Coordinate::new(1.5, 1.5),
            rotation,
        }
    }

    #[test]
    fn test_bearing_degrees() {
        assert_eq!(building(0.0).bearing_degrees(), 0.0);
        assert!((building(PI / 2.0).bearing_degrees() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_corners() {
        let corners = building(0.0).bounds.corners();
        assert_eq!(corners, [LatLng { lat: 1.0, lng: 1.0 }, LatLng { lat: 2.0, lng: 2.0 }]);
    }

    #[test]
    fn test_route_path_keeps_order() {
        let route = Route {
            points: vec![
                RoutePoint { coordinate: Coordinate::new(1.0, 2.0), floor_identifier: String::new() },
                RoutePoint { coordinate: Coordinate::new(3.0, 4.0), floor_identifier: String::new() },
            ],
        };
        assert_eq!(route.path(), vec![LatLng { lat: 1.0, lng: 2.0 }, LatLng { lat: 3.0, lng: 4.0 }]);
    }

    #[test]
    fn test_position_without_coordinate() {
        let position: Position = serde_json::from_str(r#"{"status_name":"CALCULATING"}"#).unwrap();
        assert!(position.lat_lng().is_none());
        assert_eq!(position.status_name, "CALCULATING");
    }
}
