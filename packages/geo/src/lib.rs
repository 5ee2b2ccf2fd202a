#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Distance math for incident positions.
//!
//! Two distance measures are provided:
//!
//! - [`distance_km`]: great-circle distance (haversine). Used wherever the
//!   result is compared against a user-facing threshold, such as the 2 km
//!   proximity alert radius.
//! - [`planar_distance`]: a flat `sqrt(dLat² + dLng²)` in degree units.
//!   Only suitable for clustering radius comparisons, where sub-kilometer
//!   precision is unnecessary and the all-pairs scan makes trig expensive.

pub use urban_guardian_geo_models::LatLng;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two positions in kilometers.
#[must_use]
pub fn distance_km(p1: LatLng, p2: LatLng) -> f64 {
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lng = (p2.lng - p1.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Planar distance between two positions, in degrees.
///
/// Ignores the Earth's curvature and the shrinking of longitude degrees
/// away from the equator.
#[must_use]
pub fn planar_distance(p1: LatLng, p2: LatLng) -> f64 {
    (p2.lat - p1.lat).hypot(p2.lng - p1.lng)
}

/// Returns `true` if `p2` lies within `radius` degrees of `p1` (inclusive),
/// using [`planar_distance`].
#[must_use]
pub fn within_radius(p1: LatLng, p2: LatLng, radius: f64) -> bool {
    planar_distance(p1, p2) <= radius
}
