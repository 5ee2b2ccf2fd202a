//! In-memory incident state and its derived view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use urban_guardian_alerts::{Alert, AlertOutcome, AlertSession, ChangeId, NotificationCapability};
use urban_guardian_cluster::{Cluster, Hotspot, compute_clusters_with, rank_hotspots};
use urban_guardian_config::EngineConfig;
use urban_guardian_geo::LatLng;
use urban_guardian_heatmap::{HeatSample, project_clusters};
use urban_guardian_incident_models::{Incident, IncidentId, IncidentUpdate};

/// Something that happened to the session, in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The real-time channel delivered a new incident.
    IncidentCreated(Incident),
    /// The real-time channel delivered an incident with its update log.
    IncidentUpdated {
        incident: Incident,
        updates: Vec<IncidentUpdate>,
    },
    /// An incident was removed from the store.
    IncidentDeleted(IncidentId),
    /// A new position fix for the user.
    PositionUpdated(LatLng),
    /// The user asked for alerts; carries what the platform allows.
    AlertsEnabled(NotificationCapability),
    /// The user switched alerts off.
    AlertsDisabled,
    /// The local user submitted this incident.
    LocalIncidentSubmitted(Incident),
    /// The local user posted this status update.
    LocalUpdatePosted(IncidentUpdate),
}

/// What the caller should do after an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventEffects {
    /// Notifications to show, in order.
    pub alerts: Vec<Alert>,
    /// Whether the view is out of date.
    pub needs_recompute: bool,
}

impl EventEffects {
    const fn recompute() -> Self {
        Self {
            alerts: Vec::new(),
            needs_recompute: true,
        }
    }
}

/// Everything the map and dashboard render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    /// Clusters of the current incident set.
    pub clusters: Vec<Cluster>,
    /// One heat sample per cluster.
    pub heat_samples: Vec<HeatSample>,
    /// Largest multi-incident clusters, biggest first.
    pub hotspots: Vec<Hotspot>,
    /// Mutation count of the incident set this view was computed from.
    pub generation: u64,
}

/// A detached copy of the incident set, ready to be recomputed off the
/// event loop.
#[derive(Debug, Clone)]
pub struct RecomputeJob {
    incidents: Vec<Incident>,
    generation: u64,
    config: EngineConfig,
}

impl RecomputeJob {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Clusters, projects and ranks the captured incidents.
    #[must_use]
    pub fn run(&self, now: DateTime<Utc>) -> ViewSnapshot {
        let clustering = &self.config.clustering;
        let clusters = compute_clusters_with(
            self.config.strategy(),
            &self.incidents,
            now,
            clustering.radius,
        );
        let heat_samples = project_clusters(&clusters);
        let hotspots = rank_hotspots(&clusters, clustering.hotspot_limit)
            .iter()
            .map(Hotspot::from)
            .collect();

        ViewSnapshot {
            clusters,
            heat_samples,
            hotspots,
            generation: self.generation,
        }
    }
}

/// The client-side incident collection, alert state and latest view.
///
/// Mutations are applied in the order [`Session::apply`] is called.
/// Derived data is only ever computed from a read-only copy.
#[derive(Debug, Clone)]
pub struct Session {
    config: EngineConfig,
    incidents: Vec<Incident>,
    alerts: AlertSession,
    snapshot: ViewSnapshot,
    generation: u64,
}

impl Session {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            alerts: config.alert_session(),
            config,
            incidents: Vec::new(),
            snapshot: ViewSnapshot::default(),
            generation: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Incidents in receipt order.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    #[must_use]
    pub const fn alerts(&self) -> &AlertSession {
        &self.alerts
    }

    /// The most recently installed view.
    #[must_use]
    pub const fn snapshot(&self) -> &ViewSnapshot {
        &self.snapshot
    }

    /// Mutation count of the current incident set.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the whole incident set, e.g. after the initial fetch.
    pub fn load(&mut self, incidents: Vec<Incident>) {
        log::debug!("Loaded {} incidents", incidents.len());
        self.incidents = incidents;
        self.generation += 1;
    }

    /// Applies one event.
    pub fn apply(&mut self, event: SessionEvent, now: DateTime<Utc>) -> EventEffects {
        match event {
            SessionEvent::IncidentCreated(incident) => {
                let change = ChangeId::Incident(incident.id);
                self.observe(change, incident, now)
            }
            SessionEvent::IncidentUpdated { incident, updates } => {
                let change = ChangeId::Update(incident.id);
                self.observe(change, incident.with_updates(&updates), now)
            }
            SessionEvent::IncidentDeleted(id) => {
                let before = self.incidents.len();
                self.incidents.retain(|incident| incident.id != id);
                if self.incidents.len() == before {
                    log::debug!("Delete for unknown incident {id}");
                    return EventEffects::default();
                }
                self.generation += 1;
                EventEffects::recompute()
            }
            SessionEvent::PositionUpdated(position) => {
                self.alerts.update_position(position);
                EventEffects::default()
            }
            SessionEvent::AlertsEnabled(capability) => {
                match self.alerts.enable_with(capability, &self.incidents) {
                    Ok(alerts) => EventEffects {
                        alerts,
                        needs_recompute: false,
                    },
                    Err(e) => {
                        log::warn!("Could not enable alerts: {e}");
                        EventEffects::default()
                    }
                }
            }
            SessionEvent::AlertsDisabled => {
                self.alerts.disable();
                EventEffects::default()
            }
            SessionEvent::LocalIncidentSubmitted(incident) => {
                self.alerts
                    .mark_self_originated(ChangeId::Incident(incident.id), now);
                self.upsert(incident);
                EventEffects::recompute()
            }
            SessionEvent::LocalUpdatePosted(update) => {
                self.alerts
                    .mark_self_originated(ChangeId::Update(update.incident_id), now);
                let Some(incident) = self
                    .incidents
                    .iter_mut()
                    .find(|incident| incident.id == update.incident_id)
                else {
                    log::warn!("Local update for unknown incident {}", update.incident_id);
                    return EventEffects::default();
                };
                incident.status = update.status;
                self.generation += 1;
                EventEffects::recompute()
            }
        }
    }

    /// Stores a delivered incident and decides on its side effects.
    fn observe(
        &mut self,
        change: ChangeId,
        incident: Incident,
        now: DateTime<Utc>,
    ) -> EventEffects {
        let outcome = self.alerts.on_change(change, &incident, now);
        self.upsert(incident);
        match outcome {
            AlertOutcome::Suppressed => {
                log::debug!("Suppressed self-echo {change}");
                EventEffects::default()
            }
            AlertOutcome::Notify(alert) => EventEffects {
                alerts: vec![alert],
                needs_recompute: true,
            },
            AlertOutcome::OutOfRange(_) | AlertOutcome::Skipped(_) => EventEffects::recompute(),
        }
    }

    fn upsert(&mut self, incident: Incident) {
        if let Some(existing) = self.incidents.iter_mut().find(|i| i.id == incident.id) {
            *existing = incident;
        } else {
            self.incidents.push(incident);
        }
        self.generation += 1;
    }

    /// Captures the current incident set for recomputation.
    #[must_use]
    pub fn prepare_recompute(&self) -> RecomputeJob {
        RecomputeJob {
            incidents: self.incidents.clone(),
            generation: self.generation,
            config: self.config,
        }
    }

    /// Installs a computed view unless a newer one is already installed.
    ///
    /// Returns `false` if `snapshot` was stale and discarded.
    pub fn install_snapshot(&mut self, snapshot: ViewSnapshot) -> bool {
        if snapshot.generation < self.snapshot.generation {
            log::debug!(
                "Discarding stale snapshot {} (current {})",
                snapshot.generation,
                self.snapshot.generation
            );
            return false;
        }
        self.snapshot = snapshot;
        true
    }

    /// Recomputes the view from the current incident set and installs it.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> &ViewSnapshot {
        let snapshot = self.prepare_recompute().run(now);
        log::trace!(
            "Recomputed generation {}: {} clusters, {} hotspots",
            snapshot.generation,
            snapshot.clusters.len(),
            snapshot.hotspots.len()
        );
        self.install_snapshot(snapshot);
        &self.snapshot
    }
}
