//! Session aggregate and the central guard table
//!
//! One `Session` exists per building view. It is owned by the
//! `SessionController`; nothing else mutates it.

use crate::domain::state::{
    MapState, NavigationState, OverlayState, PositioningState, SessionError,
};
use crate::domain::types::{Building, Floor, MarkerId, Poi, PoiCategory, PolylineId, Position, Route};
use serde::Serialize;
use uuid::Uuid;

pub const MSG_MAP_REQUIRED_FOR_POIS: &str = "The map must be visible in order to show the POIs";
pub const MSG_NO_POIS: &str = "This building has no POIs";
pub const MSG_POSITIONING_ALREADY_ENABLED: &str = "Position listener is already enabled.";
pub const MSG_MAP_REQUIRED_FOR_POSITIONING: &str =
    "The map must be visible in order to launch the positioning";
pub const MSG_ROUTE_CONDITIONS: &str = "The map with the POIs must be visible and the positioning must be started in order to determine the route";
pub const MSG_NAVIGATION_ALREADY_ACTIVE: &str = "Navigation is already activated";
pub const MSG_NAVIGATION_ALREADY_INACTIVE: &str = "Navigation is already deactivated";
pub const MSG_POSITIONING_REQUIRED_FOR_NAVIGATION: &str =
    "The positioning must be started in order to navigate";

/// Operations gated by session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MountMap,
    LoadPois,
    StartPositioning,
    StopPositioning,
    RequestNavigation,
    RemoveNavigation,
    RequestRoute,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::MountMap => "mount_map",
            Operation::LoadPois => "load_pois",
            Operation::StartPositioning => "start_positioning",
            Operation::StopPositioning => "stop_positioning",
            Operation::RequestNavigation => "request_navigation",
            Operation::RemoveNavigation => "remove_navigation",
            Operation::RequestRoute => "request_route",
        }
    }
}

/// Outcome of a successful guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Proceed,
    /// Silent no-op: nothing to do, nothing to report
    Skip,
}

/// Mutable session aggregate
#[derive(Debug, Clone)]
pub struct Session {
    /// UUIDv7 session id (time-sortable)
    pub id: String,
    pub building: Building,
    pub floors: Vec<Floor>,
    pub current_floor: Option<Floor>,
    pub map: MapState,
    pub positioning: PositioningState,
    pub navigation: NavigationState,
    pub accessible: bool,
    pub current_position: Option<Position>,
    pub pois: Option<Vec<Poi>>,
    pub poi_categories: Option<Vec<PoiCategory>>,
    pub poi_markers: Vec<MarkerId>,
    pub route: Option<Route>,
    pub route_polyline: Option<PolylineId>,
    /// Tracking marker for the live position
    pub current_marker: Option<MarkerId>,
}

impl Session {
    pub fn new(building: Building) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            building,
            floors: Vec::new(),
            current_floor: None,
            map: MapState::Unloaded,
            positioning: PositioningState::Idle,
            navigation: NavigationState::Off,
            accessible: false,
            current_position: None,
            pois: None,
            poi_categories: None,
            poi_markers: Vec::new(),
            route: None,
            route_polyline: None,
            current_marker: None,
        }
    }

    #[inline]
    pub fn map_loaded(&self) -> bool {
        self.map.is_ready()
    }

    #[inline]
    pub fn positioning_active(&self) -> bool {
        self.positioning == PositioningState::Active
    }

    #[inline]
    pub fn navigating(&self) -> bool {
        self.navigation == NavigationState::On
    }

    #[inline]
    pub fn has_pois(&self) -> bool {
        self.pois.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Decide whether `op` may run in the current state.
    ///
    /// All state-dependent preconditions live here. Handlers call this first
    /// and only touch collaborators on `Admission::Proceed`.
    pub fn admit(&self, op: Operation) -> Result<Admission, SessionError> {
        match op {
            Operation::MountMap => {
                if self.map == MapState::Unloaded {
                    Ok(Admission::Proceed)
                } else {
                    Ok(Admission::Skip)
                }
            }
            Operation::LoadPois => {
                if !self.map_loaded() {
                    return Err(SessionError::precondition(MSG_MAP_REQUIRED_FOR_POIS));
                }
                Ok(Admission::Proceed)
            }
            Operation::StartPositioning => {
                if self.positioning != PositioningState::Idle {
                    return Err(SessionError::AlreadyActive(MSG_POSITIONING_ALREADY_ENABLED));
                }
                if !self.map_loaded() {
                    return Err(SessionError::precondition(MSG_MAP_REQUIRED_FOR_POSITIONING));
                }
                Ok(Admission::Proceed)
            }
            Operation::StopPositioning => {
                if self.positioning == PositioningState::Idle {
                    Ok(Admission::Skip)
                } else {
                    Ok(Admission::Proceed)
                }
            }
            Operation::RequestNavigation => {
                if self.navigating() {
                    return Err(SessionError::AlreadyActive(MSG_NAVIGATION_ALREADY_ACTIVE));
                }
                if self.positioning == PositioningState::Idle {
                    return Err(SessionError::precondition(MSG_POSITIONING_REQUIRED_FOR_NAVIGATION));
                }
                Ok(Admission::Proceed)
            }
            Operation::RemoveNavigation => {
                if !self.navigating() {
                    return Err(SessionError::AlreadyInactive(MSG_NAVIGATION_ALREADY_INACTIVE));
                }
                Ok(Admission::Proceed)
            }
            Operation::RequestRoute => {
                if !self.map_loaded()
                    || !self.has_pois()
                    || !self.positioning_active()
                    || self.current_position.is_none()
                {
                    return Err(SessionError::precondition(MSG_ROUTE_CONDITIONS));
                }
                Ok(Admission::Proceed)
            }
        }
    }

    /// Check the cross-subsystem invariants, returning the first violation
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.positioning != PositioningState::Idle && self.current_marker.is_none() {
            return Err("positioning without tracking marker");
        }
        if self.navigating() && self.positioning == PositioningState::Idle {
            return Err("navigating without positioning");
        }
        if self.route.is_some()
            && !(self.has_pois() && self.map_loaded() && self.positioning_active())
        {
            return Err("route without map, pois and live position");
        }
        Ok(())
    }

    /// Read-only view published after every change
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            map: self.map,
            positioning: self.positioning,
            navigation: self.navigation,
            accessible: self.accessible,
            current_floor: self.current_floor.as_ref().map(|f| f.identifier.clone()),
            current_position: self.current_position.clone(),
            poi_count: self.pois.as_ref().map(Vec::len),
            route_points: self.route.as_ref().map(|r| r.points.len()),
        }
    }
}

/// Change-detection payload for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub map: MapState,
    pub positioning: PositioningState,
    pub navigation: NavigationState,
    pub accessible: bool,
    pub current_floor: Option<String>,
    pub current_position: Option<Position>,
    pub poi_count: Option<usize>,
    pub route_points: Option<usize>,
}

impl SessionSnapshot {
    pub fn map_hidden(&self) -> bool {
        !self.map.is_ready()
    }

    pub fn overlay_failed(&self) -> bool {
        self.map == MapState::Ready { overlay: OverlayState::Failed }
    }

    pub fn positioning_stopped(&self) -> bool {
        self.positioning != PositioningState::Active
    }

    pub fn no_pois(&self) -> bool {
        self.poi_count.unwrap_or(0) == 0
    }

    pub fn route_conditions_not_set(&self) -> bool {
        self.no_pois() || self.map_hidden() || self.positioning_stopped()
    }

    pub fn navigation_conditions_not_set(&self) -> bool {
        self.route_conditions_not_set() || self.route_points.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Bounds, Coordinate};

    fn building() -> Building {
        Building {
            identifier: "1234".to_string(),
            name: "HQ".to_string(),
            bounds: Bounds {
                south_west: Coordinate::new(1.0, 1.0),
                north_east: Coordinate::new(2.0, 2.0),
            },
            center: Coordinate::new(1.5, 1.5),
            rotation: 0.0,
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::new(building());
        session.map = MapState::Ready { overlay: OverlayState::Drawn };
        session
    }

    fn poi() -> Poi {
        Poi {
            identifier: "p1".to_string(),
            name: "Cafe".to_string(),
            coordinate: Coordinate::new(1.2, 1.2),
            floor_identifier: String::new(),
            category_code: "food".to_string(),
        }
    }

    #[test]
    fn test_mount_skips_when_not_unloaded() {
        let mut session = Session::new(building());
        assert_eq!(session.admit(Operation::MountMap), Ok(Admission::Proceed));
        session.map = MapState::Loading;
        assert_eq!(session.admit(Operation::MountMap), Ok(Admission::Skip));
        session.map = MapState::Ready { overlay: OverlayState::Failed };
        assert_eq!(session.admit(Operation::MountMap), Ok(Admission::Skip));
    }

    #[test]
    fn test_load_pois_requires_map() {
        let session = Session::new(building());
        assert_eq!(
            session.admit(Operation::LoadPois),
            Err(SessionError::precondition(MSG_MAP_REQUIRED_FOR_POIS))
        );
        assert_eq!(ready_session().admit(Operation::LoadPois), Ok(Admission::Proceed));
    }

    #[test]
    fn test_start_positioning_checks_active_before_map() {
        let mut session = Session::new(building());
        session.positioning = PositioningState::Starting;
        assert_eq!(
            session.admit(Operation::StartPositioning),
            Err(SessionError::AlreadyActive(MSG_POSITIONING_ALREADY_ENABLED))
        );

        session.positioning = PositioningState::Idle;
        assert_eq!(
            session.admit(Operation::StartPositioning),
            Err(SessionError::precondition(MSG_MAP_REQUIRED_FOR_POSITIONING))
        );
    }

    #[test]
    fn test_stop_positioning_idle_is_skip() {
        let session = ready_session();
        assert_eq!(session.admit(Operation::StopPositioning), Ok(Admission::Skip));
    }

    #[test]
    fn test_navigation_guards() {
        let mut session = ready_session();
        assert!(matches!(
            session.admit(Operation::RequestNavigation),
            Err(SessionError::Precondition(_))
        ));
        assert_eq!(
            session.admit(Operation::RemoveNavigation),
            Err(SessionError::AlreadyInactive(MSG_NAVIGATION_ALREADY_INACTIVE))
        );

        session.positioning = PositioningState::Active;
        session.current_marker = Some(MarkerId(1));
        assert_eq!(session.admit(Operation::RequestNavigation), Ok(Admission::Proceed));

        session.navigation = NavigationState::On;
        assert_eq!(
            session.admit(Operation::RequestNavigation),
            Err(SessionError::AlreadyActive(MSG_NAVIGATION_ALREADY_ACTIVE))
        );
    }

    #[test]
    fn test_route_requires_every_condition() {
        let combined = Err(SessionError::precondition(MSG_ROUTE_CONDITIONS));
        let mut session = ready_session();
        assert_eq!(session.admit(Operation::RequestRoute), combined);

        session.pois = Some(vec![]);
        session.positioning = PositioningState::Active;
        session.current_marker = Some(MarkerId(1));
        session.current_position = Some(Position::default());
        assert_eq!(session.admit(Operation::RequestRoute), combined);

        session.pois = Some(vec![poi()]);
        assert_eq!(session.admit(Operation::RequestRoute), Ok(Admission::Proceed));

        session.map = MapState::Unloaded;
        assert_eq!(session.admit(Operation::RequestRoute), combined);
    }

    #[test]
    fn test_invariants() {
        let mut session = ready_session();
        assert!(session.check_invariants().is_ok());

        session.positioning = PositioningState::Starting;
        assert!(session.check_invariants().is_err());
        session.current_marker = Some(MarkerId(7));
        assert!(session.check_invariants().is_ok());

        session.route = Some(Route::default());
        assert_eq!(
            session.check_invariants(),
            Err("route without map, pois and live position")
        );
    }

    #[test]
    fn test_snapshot_predicates() {
        let mut session = Session::new(building());
        let snapshot = session.snapshot();
        assert!(snapshot.map_hidden());
        assert!(snapshot.no_pois());
        assert!(snapshot.route_conditions_not_set());
        assert!(snapshot.navigation_conditions_not_set());

        session.map = MapState::Ready { overlay: OverlayState::Drawn };
        session.pois = Some(vec![poi()]);
        session.positioning = PositioningState::Active;
        session.current_marker = Some(MarkerId(1));
        let snapshot = session.snapshot();
        assert!(!snapshot.route_conditions_not_set());
        assert!(snapshot.navigation_conditions_not_set());

        session.route = Some(Route::default());
        assert!(!session.snapshot().navigation_conditions_not_set());
    }
}
