//! User-facing notifications and loading indicators
//!
//! Fire-and-forget: the session never waits on or inspects the result.

use crate::domain::types::Placement;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Handle for a presented loading indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadingId(pub u64);

pub trait Notifier: Send + Sync {
    /// Show a transient message
    fn show(&self, message: &str, placement: Placement);

    fn present_loading(&self, message: &str) -> LoadingId;

    fn dismiss_loading(&self, id: LoadingId);
}

/// Notifier that renders messages as structured log lines
pub struct LogNotifier {
    duration_ms: u64,
    next_loading: AtomicU64,
}

impl LogNotifier {
    pub fn new(duration_ms: u64) -> Self {
        Self { duration_ms, next_loading: AtomicU64::new(1) }
    }
}

impl Notifier for LogNotifier {
    fn show(&self, message: &str, placement: Placement) {
        info!(
            message = %message,
            placement = %placement.as_str(),
            duration_ms = %self.duration_ms,
            "toast"
        );
    }

    fn present_loading(&self, message: &str) -> LoadingId {
        let id = LoadingId(self.next_loading.fetch_add(1, Ordering::Relaxed));
        info!(loading_id = %id.0, message = %message, "loading_presented");
        id
    }

    fn dismiss_loading(&self, id: LoadingId) {
        info!(loading_id = %id.0, "loading_dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_ids_are_distinct() {
        let notifier = LogNotifier::new(2000);
        let a = notifier.present_loading("Loading map...");
        let b = notifier.present_loading("Loading map...");
        assert_ne!(a, b);
        notifier.dismiss_loading(a);
        notifier.show("hello", Placement::Bottom);
    }
}
