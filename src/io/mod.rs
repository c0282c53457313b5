//! IO modules - external collaborator interfaces
//!
//! This module contains every boundary the session core talks to:
//! - `location` - positioning provider: location feed, navigation feedback, cache
//! - `surfaces` - map surface, POI directory and route provider
//! - `notifier` - user-facing messages and loading indicators
//! - `journal` - session transitions to file (JSONL format)
//! - `simulated` - in-process collaborators for the binary and tests

pub mod journal;
pub mod location;
pub mod notifier;
pub mod simulated;
pub mod surfaces;

// Re-export commonly used types
pub use journal::Journal;
pub use location::{feed_channel, FeedEvent, FeedSender, LocationFeed, LocationSubscription};
pub use notifier::{LoadingId, LogNotifier, Notifier};
pub use surfaces::{MapSurface, PoiDirectory, RouteProvider};
