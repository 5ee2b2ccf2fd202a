#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, status update, and category types.
//!
//! Incidents are owned by the external store and reach the core as plain
//! read-only values. The wire shape matches the store's rows: flat `lat` /
//! `lng` columns, a free-form `type` string, and an optional opaque image
//! reference that the core never interprets.
//!
//! The [`ingest`] module holds the validation applied before a reported
//! incident or status update is accepted.

pub mod ingest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use urban_guardian_geo_models::LatLng;

/// Store-assigned incident identifier.
pub type IncidentId = i64;

/// Lifecycle status of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IncidentStatus {
    /// Newly reported, not yet confirmed.
    #[default]
    Reported,
    /// Confirmed by another actor.
    Verified,
    /// Responders are on the way or on site.
    Responding,
    /// The incident is over.
    Resolved,
    /// The report turned out to be wrong.
    FalseAlarm,
}

impl IncidentStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Reported,
            Self::Verified,
            Self::Responding,
            Self::Resolved,
            Self::FalseAlarm,
        ]
    }
}

/// Known incident categories.
///
/// Incidents carry their category as a free string; this enum is the typed
/// view of it. Parsing is case-insensitive and never fails: see
/// [`IncidentCategory::from_type`].
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
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IncidentCategory {
    /// Earthquake or tremor.
    Earthquake,
    /// Building, vehicle or wild fire.
    Fire,
    /// Theft, assault and other criminal activity.
    Crime,
    /// Traffic or workplace accident.
    Accident,
    /// Medical emergency.
    Medical,
    /// Road hazard, debris, flooding, downed lines.
    Hazard,
    /// Anything not matching a known category.
    Other,
}

impl IncidentCategory {
    /// Maps a reported type string to a category.
    ///
    /// Surrounding whitespace and letter case are ignored. Unrecognized
    /// strings map to [`IncidentCategory::Other`].
    #[must_use]
    pub fn from_type(incident_type: &str) -> Self {
        incident_type.trim().parse().unwrap_or(Self::Other)
    }

    /// Returns the severity weight for this category.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Earthquake => 10,
            Self::Fire => 9,
            Self::Crime => 8,
            Self::Accident => 7,
            Self::Medical => 6,
            Self::Hazard => 5,
            Self::Other => 4,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Earthquake,
            Self::Fire,
            Self::Crime,
            Self::Accident,
            Self::Medical,
            Self::Hazard,
            Self::Other,
        ]
    }
}

/// A reported incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Store-assigned identifier.
    pub id: IncidentId,
    /// Category string as reported (e.g. `"fire"`).
    #[serde(rename = "type")]
    pub incident_type: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Where the incident happened.
    #[serde(flatten)]
    pub position: LatLng,
    /// When the incident was reported.
    pub timestamp: DateTime<Utc>,
    /// Current status (latest update wins).
    #[serde(default)]
    pub status: IncidentStatus,
    /// Opaque image reference, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Incident {
    /// Returns the typed category of this incident.
    #[must_use]
    pub fn category(&self) -> IncidentCategory {
        IncidentCategory::from_type(&self.incident_type)
    }

    /// Returns this incident with its status set from the latest entry of
    /// its update log.
    ///
    /// Updates belonging to other incidents are ignored. An empty log
    /// leaves the status unchanged.
    #[must_use]
    pub fn with_updates(mut self, updates: &[IncidentUpdate]) -> Self {
        let id = self.id;
        if let Some(status) = latest_status(updates.iter().filter(|u| u.incident_id == id)) {
            self.status = status;
        }
        self
    }
}

/// An entry in an incident's append-only update log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// The incident this update belongs to.
    pub incident_id: IncidentId,
    /// Status the incident moves to.
    pub status: IncidentStatus,
    /// Free-text note.
    #[serde(rename = "update_text")]
    pub text: String,
    /// When the update was posted.
    pub timestamp: DateTime<Utc>,
}

/// Returns the status of the most recent update.
///
/// The update with the greatest timestamp wins; among equal timestamps the
/// one appearing later in the log wins. Returns `None` for an empty log.
pub fn latest_status<'a>(
    updates: impl IntoIterator<Item = &'a IncidentUpdate>,
) -> Option<IncidentStatus> {
    updates
        .into_iter()
        .fold(None::<&IncidentUpdate>, |best, u| match best {
            Some(b) if b.timestamp > u.timestamp => Some(b),
            _ => Some(u),
        })
        .map(|u| u.status)
}
