#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic coordinate types.
//!
//! [`LatLng`] is the single position type used by incidents, clusters,
//! heat samples and user positions. Coordinates are WGS84 degrees.

use serde::{Deserialize, Serialize};

/// Valid latitude range in degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Valid longitude range in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Errors raised when a coordinate pair cannot be accepted.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude or longitude is out of range or not a finite number.
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate {
        /// The rejected latitude.
        lat: f64,
        /// The rejected longitude.
        lng: f64,
    },
}

/// A point on the Earth's surface in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lng: f64,
}

impl LatLng {
    /// Creates a position without validating it.
    ///
    /// Use [`LatLng::validated`] at ingestion boundaries.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Creates a position, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] if either component is not
    /// finite or lies outside the WGS84 range.
    pub fn validated(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let position = Self { lat, lng };
        if position.is_valid() {
            Ok(position)
        } else {
            Err(GeoError::InvalidCoordinate { lat, lng })
        }
    }

    /// Returns `true` if both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= MAX_LATITUDE
            && self.lng.abs() <= MAX_LONGITUDE
    }

    /// Returns `[lng, lat]`, the axis order used by `GeoJSON` and R-trees.
    #[must_use]
    pub const fn to_xy(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_range_edges() {
        assert!(LatLng::validated(90.0, 180.0).is_ok());
        assert!(LatLng::validated(-90.0, -180.0).is_ok());
        assert!(LatLng::validated(28.6139, 77.2090).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(LatLng::validated(90.0001, 0.0).is_err());
        assert!(LatLng::validated(0.0, -180.5).is_err());
        assert!(LatLng::validated(f64::NAN, 0.0).is_err());
        assert!(LatLng::validated(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn serializes_with_lat_lng_fields() {
        let json = serde_json::to_value(LatLng::new(28.7, 77.1)).unwrap();
        assert_eq!(json, serde_json::json!({ "lat": 28.7, "lng": 77.1 }));
    }
}
