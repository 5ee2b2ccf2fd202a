//! Distance-based notification decision.

use serde::{Deserialize, Serialize};
use urban_guardian_geo::{LatLng, distance_km};
use urban_guardian_incident_models::{Incident, IncidentId};

/// Alert radius in kilometers. Incidents at exactly this distance notify.
pub const NOTIFY_RADIUS_KM: f64 = 2.0;

/// Result of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityDecision {
    /// Whether the user should be notified.
    pub notify: bool,
    /// Great-circle distance from the user to the incident.
    pub distance_km: f64,
}

impl ProximityDecision {
    /// Decides against an explicit radius (inclusive).
    #[must_use]
    pub fn with_radius(distance_km: f64, radius_km: f64) -> Self {
        Self {
            notify: distance_km <= radius_km,
            distance_km,
        }
    }

    /// Decides against [`NOTIFY_RADIUS_KM`].
    #[must_use]
    pub fn from_distance(distance_km: f64) -> Self {
        Self::with_radius(distance_km, NOTIFY_RADIUS_KM)
    }
}

/// Checks whether an incident is close enough to the user to notify.
///
/// Uses the haversine distance, since the result is compared against a
/// threshold the user can see.
#[must_use]
pub fn evaluate_proximity(user: LatLng, incident: &Incident) -> ProximityDecision {
    ProximityDecision::from_distance(distance_km(user, incident.position))
}

/// A notification the caller should show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// The incident that triggered the alert.
    pub incident_id: IncidentId,
    /// The incident's type string.
    pub incident_type: String,
    /// Distance from the user in kilometers.
    pub distance_km: f64,
    /// Notification title, e.g. `"Nearby fire"`.
    pub title: String,
    /// Notification body, e.g. `"1.5 km away"`.
    pub body: String,
}

impl Alert {
    /// Builds an alert for an incident at the given distance.
    #[must_use]
    pub fn new(incident: &Incident, distance_km: f64) -> Self {
        Self {
            incident_id: incident.id,
            incident_type: incident.incident_type.clone(),
            distance_km,
            title: format!("Nearby {}", incident.incident_type),
            body: format!("{distance_km:.1} km away"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};
    use urban_guardian_geo::EARTH_RADIUS_KM;
    use urban_guardian_incident_models::IncidentStatus;

    fn incident_at(position: LatLng) -> Incident {
        Incident {
            id: 1,
            incident_type: "fire".to_string(),
            description: None,
            position,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            status: IncidentStatus::Reported,
            image: None,
        }
    }

    /// A point `km` kilometers due north of `origin`.
    fn north_of(origin: LatLng, km: f64) -> LatLng {
        LatLng::new(origin.lat + (km / EARTH_RADIUS_KM).to_degrees(), origin.lng)
    }

    #[test]
    fn boundary_is_inclusive() {
        assert!(ProximityDecision::from_distance(2.0).notify);
        assert!(!ProximityDecision::from_distance(2.001).notify);
        assert!(ProximityDecision::from_distance(0.0).notify);
    }

    #[test]
    fn evaluates_real_positions() {
        let user = LatLng::new(28.6139, 77.2090);

        let near = evaluate_proximity(user, &incident_at(north_of(user, 1.5)));
        assert!(near.notify);
        assert!((near.distance_km - 1.5).abs() < 1e-6);

        let edge = evaluate_proximity(user, &incident_at(north_of(user, 1.999)));
        assert!(edge.notify);

        let far = evaluate_proximity(user, &incident_at(north_of(user, 2.001)));
        assert!(!far.notify);
        assert!((far.distance_km - 2.001).abs() < 1e-6);
    }

    #[test]
    fn alert_text() {
        let alert = Alert::new(&incident_at(LatLng::new(0.0, 0.0)), 1.46);
        assert_eq!(alert.title, "Nearby fire");
        assert_eq!(alert.body, "1.5 km away");
    }

    #[test]
    fn serialized_alert_carries_text() {
        let alert = Alert::new(&incident_at(LatLng::new(0.0, 0.0)), 0.84);
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["incidentId"], 1);
        assert_eq!(json["title"], "Nearby fire");
        assert_eq!(json["body"], "0.8 km away");
    }
}
