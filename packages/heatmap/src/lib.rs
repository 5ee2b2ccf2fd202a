#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Heatmap projection.
//!
//! Turns cluster aggregates into `(lat, lng, intensity)` samples for a
//! density-map widget. Intensity is the cluster's total weight divided by a
//! calibration constant and clamped to `[0.1, 1.0]`, so low-activity
//! clusters stay visible instead of fading to nothing.
//!
//! Projection is deterministic: the same incident set and "now" always
//! produce a bit-identical sample list, which lets the rendering layer skip
//! redraws when nothing changed.

use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use urban_guardian_cluster::{Cluster, DEFAULT_CLUSTER_RADIUS, compute_clusters};
use urban_guardian_geo::LatLng;
use urban_guardian_incident_models::Incident;

/// Divisor normalizing a cluster's total weight into `[0, 1]`.
pub const HEAT_NORMALIZATION: f64 = 10.0;

/// Lowest intensity a sample can have.
pub const MIN_HEAT_INTENSITY: f64 = 0.1;

/// Highest intensity a sample can have.
pub const MAX_HEAT_INTENSITY: f64 = 1.0;

/// One point of the density map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSample {
    /// Latitude of the cluster centroid.
    pub lat: f64,
    /// Longitude of the cluster centroid.
    pub lng: f64,
    /// Normalized intensity in `[0.1, 1.0]`.
    pub intensity: f64,
}

impl HeatSample {
    /// The sample position.
    #[must_use]
    pub const fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Normalizes a cluster's total weight into a heat intensity.
///
/// Returns `None` for a non-finite total.
#[must_use]
pub fn intensity(total_intensity: f64) -> Option<f64> {
    if total_intensity.is_finite() {
        Some((total_intensity / HEAT_NORMALIZATION).clamp(MIN_HEAT_INTENSITY, MAX_HEAT_INTENSITY))
    } else {
        None
    }
}

/// Projects one cluster into a heat sample.
///
/// Returns `None` (and logs) if the cluster's aggregate is not finite.
#[must_use]
pub fn project(cluster: &Cluster) -> Option<HeatSample> {
    let Some(intensity) = intensity(cluster.total_intensity) else {
        log::error!(
            "Dropping heat sample at {}: non-finite intensity {}",
            cluster.center,
            cluster.total_intensity
        );
        return None;
    };
    Some(HeatSample {
        lat: cluster.center.lat,
        lng: cluster.center.lng,
        intensity,
    })
}

/// Projects a clustering pass, one sample per cluster in cluster order.
#[must_use]
pub fn project_clusters(clusters: &[Cluster]) -> Vec<HeatSample> {
    clusters.iter().filter_map(project).collect()
}

/// Clusters incidents with the default radius and projects the result.
#[must_use]
pub fn compute_heat_samples(incidents: &[Incident], now: DateTime<Utc>) -> Vec<HeatSample> {
    compute_heat_samples_with_radius(incidents, now, DEFAULT_CLUSTER_RADIUS)
}

/// Clusters incidents with the given radius and projects the result.
#[must_use]
pub fn compute_heat_samples_with_radius(
    incidents: &[Incident],
    now: DateTime<Utc>,
    radius: f64,
) -> Vec<HeatSample> {
    let samples = project_clusters(&compute_clusters(incidents, now, radius));
    log::trace!(
        "Projected {} heat samples from {} incidents",
        samples.len(),
        incidents.len()
    );
    samples
}

/// Converts heat samples to a `GeoJSON` feature collection.
///
/// Each sample becomes a `Point` feature with an `intensity` property.
#[must_use]
pub fn to_geojson(samples: &[HeatSample]) -> FeatureCollection {
    let features = samples
        .iter()
        .map(|sample| {
            let mut properties = JsonObject::new();
            properties.insert(
                "intensity".to_string(),
                serde_json::Value::from(sample.intensity),
            );
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![sample.lng, sample.lat]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
