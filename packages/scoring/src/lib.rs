#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Severity and recency weighting.
//!
//! Each incident contributes `severity(type) * recency_weight(age)` to the
//! intensity of the cluster it lands in. Both factors are pure lookups:
//! severity comes from the category table in
//! [`IncidentCategory::severity`], recency from a four-step age band.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use urban_guardian_incident_models::{Incident, IncidentCategory};

/// Age band an incident falls into relative to "now".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecencyBand {
    /// Younger than one day.
    Day,
    /// Younger than seven days.
    Week,
    /// Younger than thirty days.
    Month,
    /// Thirty days or older.
    Older,
}

impl RecencyBand {
    /// Classifies an incident timestamp.
    ///
    /// Upper bounds are exclusive: an incident exactly 24 hours old is in
    /// [`RecencyBand::Week`]. Timestamps in the future count as
    /// [`RecencyBand::Day`].
    #[must_use]
    pub fn classify(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age = now.signed_duration_since(timestamp);
        if age < Duration::days(1) {
            Self::Day
        } else if age < Duration::days(7) {
            Self::Week
        } else if age < Duration::days(30) {
            Self::Month
        } else {
            Self::Older
        }
    }

    /// Multiplier applied to an incident's severity.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Day => 1.0,
            Self::Week => 0.8,
            Self::Month => 0.6,
            Self::Older => 0.3,
        }
    }
}

/// Severity of a reported type string.
///
/// Total over arbitrary input: unrecognized types score as
/// [`IncidentCategory::Other`] (4).
#[must_use]
pub fn severity(incident_type: &str) -> f64 {
    f64::from(IncidentCategory::from_type(incident_type).severity())
}

/// Recency multiplier for an incident reported at `timestamp`.
#[must_use]
pub fn recency_weight(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    RecencyBand::classify(timestamp, now).weight()
}

/// An incident's contribution to cluster intensity.
#[must_use]
pub fn weight(incident: &Incident, now: DateTime<Utc>) -> f64 {
    severity(&incident.incident_type) * recency_weight(incident.timestamp, now)
}
