//! Per-user alert state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use urban_guardian_geo::{LatLng, distance_km};
use urban_guardian_incident_models::Incident;

use crate::{
    AlertError,
    echo::{ChangeId, SelfEchoTracker},
    proximity::{Alert, NOTIFY_RADIUS_KM, ProximityDecision},
};

/// Whether the platform can show notifications to this user.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationCapability {
    /// The user allowed notifications.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The platform has no notification support.
    Unsupported,
}

/// Why an incident was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// Alerts are switched off.
    Disabled,
    /// No position fix has been received yet.
    PositionUnavailable,
}

/// Result of observing one incident.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// The incident is within the radius; show this alert.
    Notify(Alert),
    /// The incident is farther away than the radius (distance in km).
    OutOfRange(f64),
    /// The incident was not evaluated.
    Skipped(SkipReason),
    /// The incident is the echo of a change this user just made.
    Suppressed,
}

impl AlertOutcome {
    /// The alert to show, if any.
    #[must_use]
    pub fn into_alert(self) -> Option<Alert> {
        match self {
            Self::Notify(alert) => Some(alert),
            Self::OutOfRange(_) | Self::Skipped(_) | Self::Suppressed => None,
        }
    }
}

/// Alert state machine for one user.
///
/// Holds whether alerts are on, the most recent position fix, and the
/// pending self-originated changes.
#[derive(Debug, Clone)]
pub struct AlertSession {
    enabled: bool,
    last_known_position: Option<LatLng>,
    notify_radius_km: f64,
    echoes: SelfEchoTracker,
}

impl Default for AlertSession {
    fn default() -> Self {
        Self::new(NOTIFY_RADIUS_KM, SelfEchoTracker::default())
    }
}

impl AlertSession {
    /// Creates a disabled session with no position.
    #[must_use]
    pub const fn new(notify_radius_km: f64, echoes: SelfEchoTracker) -> Self {
        Self {
            enabled: false,
            last_known_position: None,
            notify_radius_km,
            echoes,
        }
    }

    /// Whether alerts are switched on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The most recent valid position fix, if any.
    #[must_use]
    pub const fn last_known_position(&self) -> Option<LatLng> {
        self.last_known_position
    }

    /// Turns alerts on and checks every current incident once.
    ///
    /// Returns the alerts to show for incidents already within range.
    pub fn enable(&mut self, incidents: &[Incident]) -> Vec<Alert> {
        self.enabled = true;
        let Some(user) = self.last_known_position else {
            log::debug!("Alerts enabled without a position fix, nothing to replay");
            return Vec::new();
        };
        let alerts: Vec<Alert> = incidents
            .iter()
            .filter_map(|incident| self.evaluate(user, incident).into_alert())
            .collect();
        log::debug!(
            "Alerts enabled, {} of {} incidents in range",
            alerts.len(),
            incidents.len()
        );
        alerts
    }

    /// Turns alerts on if notifications can be shown.
    ///
    /// # Errors
    ///
    /// * [`AlertError::NotificationsUnavailable`] unless `capability` is
    ///   [`NotificationCapability::Granted`]. The session stays disabled.
    pub fn enable_with(
        &mut self,
        capability: NotificationCapability,
        incidents: &[Incident],
    ) -> Result<Vec<Alert>, AlertError> {
        match capability {
            NotificationCapability::Granted => Ok(self.enable(incidents)),
            NotificationCapability::Denied | NotificationCapability::Unsupported => {
                log::info!("Not enabling alerts: notifications {capability}");
                Err(AlertError::NotificationsUnavailable(capability))
            }
        }
    }

    /// Turns alerts off. The position fix and pending echo marks are kept.
    pub const fn disable(&mut self) {
        self.enabled = false;
    }

    /// Records the latest position fix. Invalid positions are ignored.
    pub fn update_position(&mut self, position: LatLng) {
        if position.is_valid() {
            self.last_known_position = Some(position);
        } else {
            log::warn!("Ignoring invalid position fix {position}");
        }
    }

    /// Records a change the local user is about to make so its echo is not
    /// treated as a new event.
    pub fn mark_self_originated(&mut self, change: ChangeId, now: DateTime<Utc>) {
        self.echoes.mark(change, now);
    }

    /// Observes a newly created incident.
    pub fn on_incident(&mut self, incident: &Incident, now: DateTime<Utc>) -> AlertOutcome {
        self.on_change(ChangeId::Incident(incident.id), incident, now)
    }

    /// Observes an incident delivered as part of `change`.
    ///
    /// A pending self-originated mark is consumed even when alerts are off,
    /// so the echo is swallowed exactly once either way.
    pub fn on_change(
        &mut self,
        change: ChangeId,
        incident: &Incident,
        now: DateTime<Utc>,
    ) -> AlertOutcome {
        if self.echoes.consume(change, now) {
            return AlertOutcome::Suppressed;
        }
        if !self.enabled {
            return AlertOutcome::Skipped(SkipReason::Disabled);
        }
        let Some(user) = self.last_known_position else {
            return AlertOutcome::Skipped(SkipReason::PositionUnavailable);
        };
        self.evaluate(user, incident)
    }

    fn evaluate(&self, user: LatLng, incident: &Incident) -> AlertOutcome {
        let decision = ProximityDecision::with_radius(
            distance_km(user, incident.position),
            self.notify_radius_km,
        );
        if decision.notify {
            log::debug!(
                "Incident {} ({}) is {:.3} km away, notifying",
                incident.id,
                incident.incident_type,
                decision.distance_km
            );
            AlertOutcome::Notify(Alert::new(incident, decision.distance_km))
        } else {
            log::trace!(
                "Incident {} is {:.3} km away, out of range",
                incident.id,
                decision.distance_km
            );
            AlertOutcome::OutOfRange(decision.distance_km)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone as _};
    use urban_guardian_geo::EARTH_RADIUS_KM;
    use urban_guardian_incident_models::IncidentStatus;

    const DELHI: LatLng = LatLng::new(28.6139, 77.2090);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 18, 30, 0).unwrap()
    }

    fn incident_north(id: i64, km: f64) -> Incident {
        Incident {
            id,
            incident_type: "fire".to_string(),
            description: None,
            position: LatLng::new(DELHI.lat + (km / EARTH_RADIUS_KM).to_degrees(), DELHI.lng),
            timestamp: now(),
            status: IncidentStatus::Reported,
            image: None,
        }
    }

    fn enabled_session() -> AlertSession {
        let mut session = AlertSession::default();
        session.update_position(DELHI);
        assert!(session.enable(&[]).is_empty());
        session
    }

    #[test]
    fn disabled_and_positionless_sessions_skip() {
        let mut session = AlertSession::default();
        session.update_position(DELHI);
        assert_eq!(
            session.on_incident(&incident_north(1, 0.5), now()),
            AlertOutcome::Skipped(SkipReason::Disabled)
        );

        let mut session = AlertSession::default();
        session.enable(&[]);
        assert_eq!(
            session.on_incident(&incident_north(1, 0.5), now()),
            AlertOutcome::Skipped(SkipReason::PositionUnavailable)
        );
    }

    #[test]
    fn notifies_within_radius_only() {
        let mut session = enabled_session();
        match session.on_incident(&incident_north(1, 1.5), now()) {
            AlertOutcome::Notify(alert) => {
                assert_eq!(alert.incident_id, 1);
                assert_eq!(alert.title, "Nearby fire");
                assert_eq!(alert.body, "1.5 km away");
            }
            other => panic!("expected notify, got {other:?}"),
        }
        assert!(matches!(
            session.on_incident(&incident_north(2, 2.5), now()),
            AlertOutcome::OutOfRange(d) if (d - 2.5).abs() < 1e-6
        ));
    }

    #[test]
    fn self_echo_is_suppressed_exactly_once() {
        let mut session = enabled_session();

        assert!(matches!(
            session.on_incident(&incident_north(1, 1.5), now()),
            AlertOutcome::Notify(_)
        ));

        let own = incident_north(2, 1.5);
        session.mark_self_originated(ChangeId::Incident(2), now());
        assert_eq!(session.on_incident(&own, now()), AlertOutcome::Suppressed);

        let later = now() + Duration::seconds(1);
        assert!(matches!(
            session.on_incident(&own, later),
            AlertOutcome::Notify(alert) if alert.incident_id == 2
        ));
    }

    #[test]
    fn update_echo_does_not_hide_other_incidents() {
        let mut session = enabled_session();
        session.mark_self_originated(ChangeId::Update(9), now());
        assert!(matches!(
            session.on_change(ChangeId::Update(3), &incident_north(3, 1.0), now()),
            AlertOutcome::Notify(_)
        ));
        assert_eq!(
            session.on_change(ChangeId::Update(9), &incident_north(9, 1.0), now()),
            AlertOutcome::Suppressed
        );
    }

    #[test]
    fn enable_replays_current_incidents() {
        let mut session = AlertSession::default();
        session.update_position(DELHI);
        let incidents = vec![
            incident_north(1, 0.2),
            incident_north(2, 5.0),
            incident_north(3, 1.9),
        ];
        let alerts = session.enable(&incidents);
        let ids: Vec<i64> = alerts.iter().map(|a| a.incident_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(session.is_enabled());
    }

    #[test]
    fn enable_requires_granted_capability() {
        let mut session = AlertSession::default();
        let err = session
            .enable_with(NotificationCapability::Denied, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            AlertError::NotificationsUnavailable(NotificationCapability::Denied)
        ));
        assert!(!session.is_enabled());

        assert!(
            session
                .enable_with(NotificationCapability::Granted, &[])
                .unwrap()
                .is_empty()
        );
        assert!(session.is_enabled());

        session.disable();
        assert!(!session.is_enabled());
    }

    #[test]
    fn position_is_most_recent_wins() {
        let mut session = AlertSession::default();
        session.update_position(LatLng::new(10.0, 10.0));
        session.update_position(DELHI);
        session.update_position(LatLng::new(95.0, 0.0));
        assert_eq!(session.last_known_position(), Some(DELHI));
    }

    #[test]
    fn echo_mark_is_consumed_while_disabled() {
        let mut session = AlertSession::default();
        session.update_position(DELHI);
        let own = incident_north(4, 0.5);
        session.mark_self_originated(ChangeId::Incident(4), now());

        assert_eq!(session.on_incident(&own, now()), AlertOutcome::Suppressed);
        assert_eq!(
            session.on_incident(&own, now()),
            AlertOutcome::Skipped(SkipReason::Disabled)
        );

        session.enable(&[]);
        assert!(matches!(
            session.on_incident(&own, now()),
            AlertOutcome::Notify(alert) if alert.incident_id == 4
        ));
    }

    #[test]
    fn capability_names_round_trip_through_strum() {
        let capability: NotificationCapability = "unsupported".parse().unwrap();
        assert_eq!(capability, NotificationCapability::Unsupported);
        assert_eq!(NotificationCapability::Granted.as_ref(), "granted");
        assert!("maybe".parse::<NotificationCapability>().is_err());
    }

    #[test]
    fn custom_radius() {
        let mut session = AlertSession::new(5.0, SelfEchoTracker::default());
        session.update_position(DELHI);
        session.enable(&[]);
        assert!(matches!(
            session.on_incident(&incident_north(1, 4.0), now()),
            AlertOutcome::Notify(_)
        ));
    }
}
