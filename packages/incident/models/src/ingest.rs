//! Validation for incoming reports and status updates.
//!
//! Everything rejected here is surfaced to the reporting actor and never
//! reaches the clustering or alerting core, so downstream code can assume
//! finite, in-range coordinates and a non-empty type string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use urban_guardian_geo_models::{GeoError, LatLng};

use crate::{Incident, IncidentId, IncidentStatus, IncidentUpdate};

/// Errors that reject an incoming report or update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    /// A required field was absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The reported position is not a valid coordinate.
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    /// The status string is not a known status.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}

/// An incident report as submitted by a reporting actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Category string.
    #[serde(rename = "type", default)]
    pub incident_type: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub lng: Option<f64>,
    /// Opaque image reference.
    #[serde(default)]
    pub image: Option<String>,
}

impl NewIncident {
    /// Validates the report and builds the stored [`Incident`].
    ///
    /// The type string is trimmed; an empty description is dropped.
    ///
    /// # Errors
    ///
    /// * [`IngestError::MissingField`] if `type`, `lat` or `lng` is absent,
    ///   or `type` is blank.
    /// * [`IngestError::InvalidCoordinate`] if the position is out of range
    ///   or not finite.
    pub fn validate(self, id: IncidentId, now: DateTime<Utc>) -> Result<Incident, IngestError> {
        let incident_type = self
            .incident_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(IngestError::MissingField("type"))?
            .to_string();
        let lat = self.lat.ok_or(IngestError::MissingField("lat"))?;
        let lng = self.lng.ok_or(IngestError::MissingField("lng"))?;
        let position = LatLng::validated(lat, lng)?;

        Ok(Incident {
            id,
            incident_type,
            description: self.description.filter(|d| !d.trim().is_empty()),
            position,
            timestamp: now,
            status: IncidentStatus::Reported,
            image: self.image,
        })
    }
}

/// A status update as submitted by any actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncidentUpdate {
    /// Target status name (e.g. `"responding"`).
    #[serde(default)]
    pub status: Option<String>,
    /// Free-text note.
    #[serde(default)]
    pub update_text: Option<String>,
}

impl NewIncidentUpdate {
    /// Validates the update and builds the log entry.
    ///
    /// # Errors
    ///
    /// * [`IngestError::MissingField`] if `status` or `update_text` is
    ///   absent or blank.
    /// * [`IngestError::UnknownStatus`] if `status` is not a known status.
    pub fn validate(
        self,
        incident_id: IncidentId,
        now: DateTime<Utc>,
    ) -> Result<IncidentUpdate, IngestError> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(IngestError::MissingField("status"))?;
        let text = self
            .update_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(IngestError::MissingField("update_text"))?
            .to_string();
        let status: IncidentStatus = status
            .parse()
            .map_err(|_| IngestError::UnknownStatus(status.to_string()))?;

        Ok(IncidentUpdate {
            incident_id,
            status,
            text,
            timestamp: now,
        })
    }
}
