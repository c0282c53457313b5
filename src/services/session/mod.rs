//! Session state machine and event orchestration
//!
//! The SessionController is the single owner of session state. It:
//! - Validates every UI command against the central guard table
//! - Delegates to exactly one collaborator per step (map, directory, feed, routes)
//! - Absorbs location feed events one at a time into session state
//! - Publishes a snapshot after every change for the presentation layer

mod handlers;
mod markers;

pub use markers::resolve_categories;

use crate::domain::session::{Admission, Operation, Session, SessionSnapshot};
use crate::domain::state::SessionError;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::journal::Journal;
use crate::io::location::{FeedEvent, LocationFeed, LocationSubscription};
use crate::io::notifier::Notifier;
use crate::io::surfaces::{MapSurface, PoiDirectory, RouteProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info, warn};

/// External collaborators the session delegates to
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn LocationFeed>,
    pub map: Arc<dyn MapSurface>,
    pub directory: Arc<dyn PoiDirectory>,
    pub routes: Arc<dyn RouteProvider>,
    pub notifier: Arc<dyn Notifier>,
}

/// UI actions accepted by the session loop
#[derive(Debug)]
pub enum SessionCommand {
    MountMap,
    LoadPois,
    StartPositioning,
    StopPositioning,
    RequestNavigation,
    RemoveNavigation,
    RequestRoute,
    ToggleAccessible,
    ClearCache,
    SetCacheMaxAge(Duration),
    GetCacheMaxAge(oneshot::Sender<Result<Duration, SessionError>>),
    /// View exit: stop positioning and end the loop
    Leave,
}

/// Central session orchestrator for one building view
pub struct SessionController {
    /// Session state, mutated only here
    pub(crate) session: Session,
    /// Live location subscription while positioning is not idle
    pub(crate) subscription: Option<LocationSubscription>,
    pub(crate) feed: Arc<dyn LocationFeed>,
    pub(crate) map: Arc<dyn MapSurface>,
    pub(crate) directory: Arc<dyn PoiDirectory>,
    pub(crate) routes: Arc<dyn RouteProvider>,
    pub(crate) notifier: Arc<dyn Notifier>,
    /// Application configuration
    pub(crate) config: Config,
    /// Metrics collector
    pub(crate) metrics: Arc<Metrics>,
    /// Transition journal (may be disabled)
    pub(crate) journal: Journal,
    /// Change-detection channel
    pub(crate) refresh_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Create a controller for the building named in `config`
    pub fn new(
        config: Config,
        collaborators: Collaborators,
        metrics: Arc<Metrics>,
        journal: Journal,
    ) -> Self {
        let session = Session::new(config.building().clone());
        let (refresh_tx, _) = watch::channel(session.snapshot());
        let Collaborators { feed, map, directory, routes, notifier } = collaborators;
        Self {
            session,
            subscription: None,
            feed,
            map,
            directory,
            routes,
            notifier,
            config,
            metrics,
            journal,
            refresh_tx,
        }
    }

    /// Subscribe to snapshots published after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.refresh_tx.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Run the session loop until `Leave`, channel close or shutdown.
    ///
    /// Commands and location events are handled strictly one at a time.
    /// Teardown always stops positioning before returning.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SessionCommand>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            session = %self.session.id,
            building = %self.session.building.identifier,
            "session_started"
        );
        self.journal_event("session_started", None);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Leave) | None => break,
                        Some(cmd) => {
                            let _ = self.process_command(cmd).await;
                        }
                    }
                }
                event = next_feed_event(&mut self.subscription) => {
                    self.handle_feed_event(event).await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.leave().await;
    }

    /// Dispatch a single command. Errors have already been reported.
    pub async fn process_command(&mut self, cmd: SessionCommand) -> Result<(), SessionError> {
        match cmd {
            SessionCommand::MountMap => self.mount_map().await,
            SessionCommand::LoadPois => self.load_pois().await,
            SessionCommand::StartPositioning => self.start_positioning().await,
            SessionCommand::StopPositioning => self.stop_positioning().await,
            SessionCommand::RequestNavigation => self.request_navigation().await,
            SessionCommand::RemoveNavigation => self.remove_navigation().await,
            SessionCommand::RequestRoute => self.request_route().await,
            SessionCommand::ToggleAccessible => {
                self.toggle_accessible();
                Ok(())
            }
            SessionCommand::ClearCache => self.clear_cache().await,
            SessionCommand::SetCacheMaxAge(max_age) => self.set_cache_max_age(max_age).await,
            SessionCommand::GetCacheMaxAge(reply) => {
                let result = self.cache_max_age().await;
                let _ = reply.send(result.clone());
                result.map(|_| ())
            }
            SessionCommand::Leave => {
                self.leave().await;
                Ok(())
            }
        }
    }

    /// Run the guard for `op`, reporting a rejection if it trips
    pub(crate) fn admit(&self, op: Operation) -> Result<Admission, SessionError> {
        self.session.admit(op).map_err(|err| self.report(op.as_str(), err))
    }

    /// Log, count, notify and journal an error; hands it back for `?`/`Err`
    pub(crate) fn report(&self, op: &str, err: SessionError) -> SessionError {
        if err.is_rejection() {
            self.metrics.record_rejection();
            warn!(
                session = %self.session.id,
                op = %op,
                kind = %err.kind(),
                reason = %err,
                "operation_rejected"
            );
        } else {
            self.metrics.record_provider_error();
            error!(session = %self.session.id, op = %op, error = %err, "provider_call_failed");
        }
        let message = err.to_string();
        self.notifier.show(&message, self.config.notifier_placement());
        self.journal_event(err.kind(), Some(message.as_str()));
        err
    }

    /// Publish the current state to change-detection subscribers
    pub(crate) fn refresh(&self) {
        debug_assert!(
            self.session.check_invariants().is_ok(),
            "session invariant violated: {:?}",
            self.session.check_invariants()
        );
        self.refresh_tx.send_replace(self.session.snapshot());
    }

    pub(crate) fn journal_event(&self, event: &str, detail: Option<&str>) {
        if self.journal.is_enabled() {
            self.journal.record(event, &self.session.snapshot(), detail);
        }
    }
}

/// Next event from the live subscription; pending forever when there is none
async fn next_feed_event(subscription: &mut Option<LocationSubscription>) -> Option<FeedEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}
