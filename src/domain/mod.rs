//! Domain models - core session types and state
//!
//! This module contains the canonical data types used throughout the system:
//! - `types` - buildings, floors, positions, POIs, routes and collaborator payloads
//! - `state` - per-subsystem state enums and the error taxonomy
//! - `session` - the `Session` aggregate, its guard table and snapshots

pub mod session;
pub mod state;
pub mod types;

// Re-export commonly used types at module level
pub use session::{Admission, Operation, Session, SessionSnapshot};
pub use state::{MapState, NavigationState, OverlayState, PositioningState, ProviderError, SessionError};
