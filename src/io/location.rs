//! Location feed interface
//!
//! The positioning provider is modelled as a set of async calls plus one
//! long-lived subscription. `start` hands back a `LocationSubscription`; the
//! session drains it one event at a time and cancels it on stop.

use crate::domain::state::ProviderError;
use crate::domain::types::{LocationOptions, Position};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Item delivered on the location subscription
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Location(Position),
    /// Error channel of the feed. Before the first location this means
    /// registration failed.
    Error(ProviderError),
}

/// Consumer half of a location feed
pub struct LocationSubscription {
    events: mpsc::Receiver<FeedEvent>,
    cancel: CancellationToken,
}

impl LocationSubscription {
    /// Receive the next event, or `None` once cancelled or the feed closed
    pub async fn next(&mut self) -> Option<FeedEvent> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer half held by a feed implementation
#[derive(Clone)]
pub struct FeedSender {
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl FeedSender {
    /// Deliver an event. Returns false once the subscriber has gone away.
    pub async fn send(&self, event: FeedEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the subscriber cancels
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Create a bounded feed channel
pub fn feed_channel(buffer: usize) -> (FeedSender, LocationSubscription) {
    let (tx, events) = mpsc::channel(buffer);
    let cancel = CancellationToken::new();
    (FeedSender { tx, cancel: cancel.clone() }, LocationSubscription { events, cancel })
}

/// Positioning provider: location feed, navigation feedback and response cache
#[async_trait]
pub trait LocationFeed: Send + Sync {
    /// Register for continuous location updates
    async fn start(&self, options: LocationOptions) -> Result<LocationSubscription, ProviderError>;

    /// End the feed. Resolves once the provider acknowledges.
    async fn stop(&self) -> Result<(), ProviderError>;

    /// Report a new position for navigation progress
    async fn send_navigation_feedback(&self, position: Position) -> Result<(), ProviderError>;

    async fn request_navigation_updates(&self) -> Result<(), ProviderError>;

    async fn remove_navigation_updates(&self) -> Result<(), ProviderError>;

    /// Invalidate every cached provider response
    async fn clear_cache(&self) -> Result<(), ProviderError>;

    async fn set_cache_max_age(&self, max_age: Duration) -> Result<(), ProviderError>;

    async fn cache_max_age(&self) -> Result<Duration, ProviderError>;
}
