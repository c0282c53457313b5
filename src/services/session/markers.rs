//! Translation from session data to map surface payloads

use crate::domain::types::{
    Building, Floor, GroundOverlayOptions, LatLng, MapOptions, MarkerIcon, MarkerOptions, Poi,
    PoiCategory, PolylineOptions, Route,
};
use rustc_hash::FxHashMap;

pub(crate) fn map_options(building: &Building, zoom: u8) -> MapOptions {
    MapOptions { target: building.center.into(), zoom }
}

/// Floor plan overlay stretched over the building bounds
pub(crate) fn overlay_options(building: &Building, floor: &Floor) -> GroundOverlayOptions {
    GroundOverlayOptions {
        url: floor.map_url.clone(),
        bounds: building.bounds.corners(),
        bearing: building.bearing_degrees(),
    }
}

/// Tracking marker, parked at the origin until the first fix arrives
pub(crate) fn position_marker_options(title: &str) -> MarkerOptions {
    MarkerOptions { position: LatLng::ORIGIN, title: title.to_string(), icon: None }
}

/// POI marker; uses the category's selected icon when there is one
pub(crate) fn poi_marker_options(
    poi: &Poi,
    category: Option<&PoiCategory>,
    icon_size: u32,
) -> MarkerOptions {
    let icon = category
        .and_then(|c| c.icon_selected.as_ref())
        .map(|url| MarkerIcon { url: url.clone(), width: icon_size, height: icon_size });
    MarkerOptions { position: poi.coordinate.into(), title: poi.name.clone(), icon }
}

pub(crate) fn route_polyline_options(route: &Route, color: &str, width: u32) -> PolylineOptions {
    PolylineOptions { points: route.path(), color: color.to_string(), width }
}

/// Pair every POI with its category, in POI order.
///
/// POIs whose code matches no category get `None`.
pub fn resolve_categories<'a>(
    pois: &'a [Poi],
    categories: &'a [PoiCategory],
) -> Vec<(&'a Poi, Option<&'a PoiCategory>)> {
    let by_code: FxHashMap<&str, &PoiCategory> =
        categories.iter().map(|c| (c.code.as_str(), c)).collect();
    pois.iter().map(|poi| (poi, by_code.get(poi.category_code.as_str()).copied())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Bounds, Coordinate, RoutePoint};
    use std::f64::consts::PI;

    fn poi(code: &str) -> Poi {
        Poi {
            identifier: format!("poi-{}", code),
            name: format!("POI {}", code),
            coordinate: Coordinate::new(1.25, 1.75),
            floor_identifier: "f1".to_string(),
            category_code: code.to_string(),
        }
    }

    fn category(code: &str, icon: Option<&str>) -> PoiCategory {
        PoiCategory {
            code: code.to_string(),
            name: code.to_uppercase(),
            icon_selected: icon.map(str::to_string),
            icon_unselected: Some("unused.png".to_string()),
        }
    }

    #[test]
    fn test_overlay_uses_bounds_and_rotation() {
        let building = Building {
            identifier: "b1".to_string(),
            name: String::new(),
            bounds: Bounds {
                south_west: Coordinate::new(1.0, 2.0),
                north_east: Coordinate::new(3.0, 4.0),
            },
            center: Coordinate::new(2.0, 3.0),
            rotation: PI,
        };
        let floor = Floor { identifier: "f1".to_string(), level: 0, map_url: "f1.png".to_string() };

        let options = overlay_options(&building, &floor);
        assert_eq!(options.url, "f1.png");
        assert_eq!(options.bounds[0], LatLng { lat: 1.0, lng: 2.0 });
        assert_eq!(options.bounds[1], LatLng { lat: 3.0, lng: 4.0 });
        assert!((options.bearing - 180.0).abs() < 1e-9);

        assert_eq!(map_options(&building, 20).target, LatLng { lat: 2.0, lng: 3.0 });
    }

    #[test]
    fn test_poi_marker_icon_from_selected_icon() {
        let cat = category("food", Some("food.png"));
        let options = poi_marker_options(&poi("food"), Some(&cat), 35);
        assert_eq!(options.title, "POI food");
        assert_eq!(options.position, LatLng { lat: 1.25, lng: 1.75 });
        let icon = options.icon.unwrap();
        assert_eq!(icon.url, "food.png");
        assert_eq!((icon.width, icon.height), (35, 35));

        // Category without a selected icon, and no category at all
        let bare = category("food", None);
        assert!(poi_marker_options(&poi("food"), Some(&bare), 35).icon.is_none());
        assert!(poi_marker_options(&poi("food"), None, 35).icon.is_none());
    }

    #[test]
    fn test_resolve_categories_keeps_poi_order() {
        let pois = vec![poi("wc"), poi("unknown"), poi("food")];
        let categories = vec![category("food", Some("food.png")), category("wc", Some("wc.png"))];

        let resolved = resolve_categories(&pois, &categories);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].1.map(|c| c.code.as_str()), Some("wc"));
        assert!(resolved[1].1.is_none());
        assert_eq!(resolved[2].1.map(|c| c.code.as_str()), Some("food"));
    }

    #[test]
    fn test_route_polyline() {
        let route = Route {
            points: vec![
                RoutePoint { coordinate: Coordinate::new(1.0, 1.0), floor_identifier: String::new() },
                RoutePoint { coordinate: Coordinate::new(1.5, 1.5), floor_identifier: String::new() },
            ],
        };
        let options = route_polyline_options(&route, "#754967", 4);
        assert_eq!(options.points.len(), 2);
        assert_eq!(options.color, "#754967");
        assert_eq!(options.width, 4);
    }

    #[test]
    fn test_position_marker_starts_at_origin() {
        let options = position_marker_options("Current position");
        assert_eq!(options.position, LatLng::ORIGIN);
        assert!(options.icon.is_none());
    }
}
