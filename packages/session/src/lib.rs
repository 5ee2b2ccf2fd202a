#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event-driven incident session.
//!
//! [`run_session`] is the single logical thread of control: it loads the
//! initial incident list, then applies events from a channel in receipt
//! order. Recomputes of the clustered view are debounced so a burst of
//! events costs one clustering pass instead of one per event.

mod state;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use urban_guardian_alerts::Alert;
use urban_guardian_config::EngineConfig;
use urban_guardian_incident_models::Incident;

pub use state::{EventEffects, RecomputeJob, Session, SessionEvent, ViewSnapshot};

/// Errors that can occur while running a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The incident source failed.
    #[error("Incident source error: {message}")]
    Source { message: String },
}

/// Supplies the initial incident list.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Fetches every current incident.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Source`] if the fetch fails.
    async fn list_incidents(&self) -> Result<Vec<Incident>, SessionError>;
}

/// Receives what the session produces.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// A notification should be shown.
    async fn alert(&self, alert: Alert);

    /// A new view has been installed.
    async fn snapshot(&self, snapshot: &ViewSnapshot);
}

/// Runs a session until the event channel closes, then returns its final
/// state.
///
/// A failing source is logged and the session starts empty. The first
/// event that invalidates the view opens a debounce window; every event
/// received before it closes shares one recompute. A window still open
/// when the channel closes is flushed before returning.
pub async fn run_session(
    source: &dyn IncidentSource,
    mut events: mpsc::Receiver<SessionEvent>,
    config: EngineConfig,
    sink: &dyn SessionSink,
) -> Session {
    let mut session = Session::new(config);

    match source.list_incidents().await {
        Ok(incidents) => session.load(incidents),
        Err(e) => log::error!("Failed to load incidents, starting empty: {e}"),
    }
    flush(&mut session, sink).await;

    let debounce = config.debounce();
    let mut deadline: Option<Instant> = None;

    loop {
        let next = match deadline {
            Some(at) => {
                if let Ok(event) = tokio::time::timeout_at(at, events.recv()).await {
                    event
                } else {
                    deadline = None;
                    flush(&mut session, sink).await;
                    continue;
                }
            }
            None => events.recv().await,
        };
        let Some(event) = next else {
            break;
        };

        let effects = session.apply(event, Utc::now());
        for alert in effects.alerts {
            sink.alert(alert).await;
        }
        if effects.needs_recompute && deadline.is_none() {
            deadline = Some(Instant::now() + debounce);
        }
    }

    if deadline.is_some() {
        flush(&mut session, sink).await;
    }
    log::debug!("Event channel closed, session ending");
    session
}

async fn flush(session: &mut Session, sink: &dyn SessionSink) {
    let snapshot = session.recompute(Utc::now()).clone();
    sink.snapshot(&snapshot).await;
}
