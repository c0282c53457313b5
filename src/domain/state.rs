//! Per-subsystem session states and the error taxonomy
//!
//! The session is modelled as three independent state enums instead of loose
//! booleans. Which combinations are legal for a given operation is decided in
//! one place, `Session::admit` (see `domain::session`).

use serde::Serialize;
use thiserror::Error;

/// Map surface lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MapState {
    Unloaded,
    /// Floors fetched and surface created, waiting for the ready signal
    Loading,
    Ready { overlay: OverlayState },
}

/// Ground overlay status once the map is ready.
///
/// `Failed` is a degraded but usable map: operations still run against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayState {
    Pending,
    Drawn,
    Failed,
}

impl MapState {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, MapState::Ready { .. })
    }

    pub fn as_str(&self) -> &str {
        match self {
            MapState::Unloaded => "unloaded",
            MapState::Loading => "loading",
            MapState::Ready { overlay: OverlayState::Pending } => "ready_overlay_pending",
            MapState::Ready { overlay: OverlayState::Drawn } => "ready",
            MapState::Ready { overlay: OverlayState::Failed } => "ready_no_overlay",
        }
    }
}

/// Location feed lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositioningState {
    Idle,
    /// Feed registered, no event received yet
    Starting,
    /// At least one event received from the feed
    Active,
}

impl PositioningState {
    pub fn as_str(&self) -> &str {
        match self {
            PositioningState::Idle => "idle",
            PositioningState::Starting => "starting",
            PositioningState::Active => "active",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavigationState {
    Off,
    On,
}

impl NavigationState {
    pub fn as_str(&self) -> &str {
        match self {
            NavigationState::Off => "off",
            NavigationState::On => "on",
        }
    }
}

/// Failure reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider unavailable")]
    Unavailable,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Errors returned by session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Operation attempted in a state that does not allow it
    #[error("{0}")]
    Precondition(String),

    /// Idempotency guard: the subsystem is already on
    #[error("{0}")]
    AlreadyActive(&'static str),

    /// Idempotency guard: the subsystem is already off
    #[error("{0}")]
    AlreadyInactive(&'static str),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl SessionError {
    pub fn precondition(message: &str) -> Self {
        SessionError::Precondition(message.to_string())
    }

    /// Short classification used in logs and the journal
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Precondition(_) => "precondition",
            SessionError::AlreadyActive(_) => "already_active",
            SessionError::AlreadyInactive(_) => "already_inactive",
            SessionError::Provider(_) => "provider",
        }
    }

    /// True for guard trips (no collaborator was contacted)
    pub fn is_rejection(&self) -> bool {
        !matches!(self, SessionError::Provider(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state_ready() {
        assert!(!MapState::Unloaded.is_ready());
        assert!(!MapState::Loading.is_ready());
        assert!(MapState::Ready { overlay: OverlayState::Failed }.is_ready());
        assert_eq!(MapState::Ready { overlay: OverlayState::Failed }.as_str(), "ready_no_overlay");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::AlreadyActive("Navigation is already activated");
        assert_eq!(err.to_string(), "Navigation is already activated");
        assert!(err.is_rejection());

        let err: SessionError = ProviderError::Rejected("no route".to_string()).into();
        assert_eq!(err.to_string(), "provider error: request rejected: no route");
        assert_eq!(err.kind(), "provider");
        assert!(!err.is_rejection());
    }
}
