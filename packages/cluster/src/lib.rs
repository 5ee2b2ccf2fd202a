#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial clustering and hotspot ranking.
//!
//! [`compute_clusters`] groups incidents with the greedy seed-radius
//! strategy and aggregates each group into a [`Cluster`]. Other strategies
//! can be swapped in through [`compute_clusters_with`] without touching
//! callers. [`rank_hotspots`] turns a clustering pass into the top-N list
//! shown to analytics consumers.
//!
//! All functions here are pure: they read the incident slice and the
//! supplied "now" and nothing else.

pub mod strategy;

use chrono::{DateTime, Utc};
use urban_guardian_geo::LatLng;
use urban_guardian_incident_models::Incident;

pub use strategy::{ClusteringStrategy, SeedRadius, StrategyKind, Transitive};
pub use urban_guardian_cluster_models::{Cluster, ClusterSizeTier, Hotspot};

/// Default clustering radius in degrees (about 1.1 km at the equator).
pub const DEFAULT_CLUSTER_RADIUS: f64 = 0.01;

/// Default number of hotspots exposed to analytics consumers.
pub const DEFAULT_HOTSPOT_LIMIT: usize = 5;

/// Clusters incidents with the default [`SeedRadius`] strategy.
///
/// Incidents with non-finite or out-of-range positions are skipped. An
/// invalid radius (negative or not finite) is logged and yields no
/// clusters.
#[must_use]
pub fn compute_clusters(incidents: &[Incident], now: DateTime<Utc>, radius: f64) -> Vec<Cluster> {
    compute_clusters_with(&SeedRadius, incidents, now, radius)
}

/// Clusters incidents with the given strategy.
///
/// Clusters come back ordered by their first member's input position, and
/// members keep input order.
#[must_use]
pub fn compute_clusters_with(
    strategy: &dyn ClusteringStrategy,
    incidents: &[Incident],
    now: DateTime<Utc>,
    radius: f64,
) -> Vec<Cluster> {
    if !radius.is_finite() || radius < 0.0 {
        log::error!("Refusing to cluster with invalid radius {radius}");
        return Vec::new();
    }

    let usable: Vec<&Incident> = incidents
        .iter()
        .filter(|incident| {
            let ok = incident.position.is_valid();
            if !ok {
                log::warn!(
                    "Skipping incident {} with invalid position {:?}",
                    incident.id,
                    incident.position
                );
            }
            ok
        })
        .collect();

    let positions: Vec<LatLng> = usable.iter().map(|incident| incident.position).collect();
    let groups = strategy.group(&positions, radius);

    log::debug!(
        "Clustered {} incidents into {} clusters (radius {radius})",
        usable.len(),
        groups.len()
    );

    groups
        .iter()
        .map(|members| aggregate(members.iter().map(|&i| usable[i]), now))
        .collect()
}

/// Returns the top `top_n` clusters with more than one member, largest
/// first.
///
/// Clusters with equal counts keep their relative order.
#[must_use]
pub fn rank_hotspots(clusters: &[Cluster], top_n: usize) -> Vec<Cluster> {
    let mut ranked: Vec<Cluster> = clusters
        .iter()
        .filter(|cluster| cluster.is_hotspot())
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.count().cmp(&a.count()));
    ranked.truncate(top_n);
    ranked
}

/// Builds a [`Cluster`] from its members.
///
/// Callers guarantee at least one member.
#[allow(clippy::cast_precision_loss)]
fn aggregate<'a>(members: impl Iterator<Item = &'a Incident>, now: DateTime<Utc>) -> Cluster {
    let members: Vec<Incident> = members.cloned().collect();
    let n = members.len() as f64;

    let (lat_sum, lng_sum) = members.iter().fold((0.0, 0.0), |(lat, lng), m| {
        (lat + m.position.lat, lng + m.position.lng)
    });
    let total_intensity: f64 = members
        .iter()
        .map(|m| urban_guardian_scoring::weight(m, now))
        .sum();
    let dominant_type = dominant_type(&members);

    Cluster {
        center: LatLng::new(lat_sum / n, lng_sum / n),
        members,
        total_intensity,
        dominant_type,
    }
}

/// The type string with the most members; ties go to the one seen first.
fn dominant_type(members: &[Incident]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for member in members {
        if let Some(entry) = counts
            .iter_mut()
            .find(|entry| entry.0 == member.incident_type)
        {
            entry.1 += 1;
        } else {
            counts.push((member.incident_type.as_str(), 1));
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (t, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((t, count));
        }
    }
    best.map(|(t, _)| t.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone as _};
    use urban_guardian_incident_models::IncidentStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn incident(id: i64, incident_type: &str, lat: f64, lng: f64, age: Duration) -> Incident {
        Incident {
            id,
            incident_type: incident_type.to_string(),
            description: None,
            position: LatLng::new(lat, lng),
            timestamp: now() - age,
            status: IncidentStatus::Reported,
            image: None,
        }
    }

    #[test]
    fn two_nearby_fires_form_one_cluster() {
        let incidents = vec![
            incident(1, "fire", 28.70, 77.10, Duration::zero()),
            incident(2, "fire", 28.701, 77.101, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.count(), 2);
        assert_eq!(cluster.dominant_type, "fire");
        assert!((cluster.total_intensity - 18.0).abs() < 1e-12);
        assert!((cluster.center.lat - 28.7005).abs() < 1e-9);
        assert!((cluster.center.lng - 77.1005).abs() < 1e-9);
    }

    #[test]
    fn identical_positions_cluster_together_in_any_order() {
        let base = vec![
            incident(1, "crime", 12.5, -3.25, Duration::hours(1)),
            incident(2, "hazard", 12.5, -3.25, Duration::days(3)),
            incident(3, "crime", 12.5, -3.25, Duration::days(60)),
            incident(4, "medical", 12.5, -3.25, Duration::zero()),
        ];
        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];
        for order in orders {
            let shuffled: Vec<Incident> = order.iter().map(|&i| base[i].clone()).collect();
            let clusters = compute_clusters(&shuffled, now(), DEFAULT_CLUSTER_RADIUS);
            assert_eq!(clusters.len(), 1, "order {order:?}");
            assert_eq!(clusters[0].count(), 4);
            assert_eq!(clusters[0].dominant_type, "crime");
        }
    }

    #[test]
    fn zero_radius_still_groups_identical_positions() {
        let incidents = vec![
            incident(1, "fire", 1.0, 1.0, Duration::zero()),
            incident(2, "fire", 1.0, 1.0, Duration::zero()),
            incident(3, "fire", 1.0, 1.000_001, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), 0.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count(), 2);
    }

    #[test]
    fn centroid_is_member_mean_not_seed() {
        let incidents = vec![
            incident(1, "accident", 0.0, 0.0, Duration::zero()),
            incident(2, "accident", 0.0, 0.006, Duration::zero()),
            incident(3, "accident", 0.006, 0.0, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters.len(), 1);
        assert!((clusters[0].center.lat - 0.002).abs() < 1e-12);
        assert!((clusters[0].center.lng - 0.002).abs() < 1e-12);
    }

    #[test]
    fn dominant_type_ties_go_to_first_seen() {
        let incidents = vec![
            incident(1, "hazard", 5.0, 5.0, Duration::zero()),
            incident(2, "fire", 5.0, 5.001, Duration::zero()),
            incident(3, "fire", 5.001, 5.0, Duration::zero()),
            incident(4, "hazard", 5.001, 5.001, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters[0].dominant_type, "hazard");
    }

    #[test]
    fn invalid_input_degrades_gracefully() {
        assert!(compute_clusters(&[], now(), DEFAULT_CLUSTER_RADIUS).is_empty());

        let incidents = vec![
            incident(1, "fire", f64::NAN, 0.0, Duration::zero()),
            incident(2, "whatever", 0.0, 0.0, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members[0].id, 2);
        assert!((clusters[0].total_intensity - 4.0).abs() < f64::EPSILON);

        assert!(compute_clusters(&incidents, now(), -1.0).is_empty());
        assert!(compute_clusters(&incidents, now(), f64::NAN).is_empty());
    }

    #[test]
    fn old_medical_incident_is_a_singleton_outside_hotspots() {
        let incidents = vec![
            incident(1, "medical", 28.6, 77.2, Duration::days(40)),
            incident(2, "fire", 10.0, 10.0, Duration::zero()),
            incident(3, "fire", 10.0, 10.001, Duration::zero()),
        ];
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count(), 1);
        assert!((clusters[0].total_intensity - 1.8).abs() < 1e-12);

        let hotspots = rank_hotspots(&clusters, DEFAULT_HOTSPOT_LIMIT);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].dominant_type, "fire");
    }

    #[test]
    fn hotspots_are_sorted_filtered_and_truncated() {
        let mut incidents = Vec::new();
        let mut id = 0;
        // Seven well-separated groups with sizes 1..=7.
        for size in 1..=7_i32 {
            for k in 0..size {
                id += 1;
                incidents.push(incident(
                    id,
                    "crime",
                    f64::from(size) * 1.0,
                    f64::from(k) * 0.0001,
                    Duration::zero(),
                ));
            }
        }
        let clusters = compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(clusters.len(), 7);

        let ranked = rank_hotspots(&clusters, DEFAULT_HOTSPOT_LIMIT);
        let counts: Vec<usize> = ranked.iter().map(Cluster::count).collect();
        assert_eq!(counts, vec![7, 6, 5, 4, 3]);

        let all = rank_hotspots(&clusters, usize::MAX);
        assert!(all.iter().all(|c| c.count() > 1));
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn equal_counts_keep_cluster_order() {
        let incidents = vec![
            incident(1, "fire", 1.0, 1.0, Duration::zero()),
            incident(2, "crime", 2.0, 2.0, Duration::zero()),
            incident(3, "fire", 1.0, 1.0, Duration::zero()),
            incident(4, "crime", 2.0, 2.0, Duration::zero()),
        ];
        let ranked = rank_hotspots(
            &compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS),
            DEFAULT_HOTSPOT_LIMIT,
        );
        let types: Vec<&str> = ranked.iter().map(|c| c.dominant_type.as_str()).collect();
        assert_eq!(types, vec!["fire", "crime"]);
    }

    #[test]
    fn transitive_strategy_merges_chains() {
        let incidents = vec![
            incident(1, "fire", 0.0, 0.0, Duration::zero()),
            incident(2, "fire", 0.0, 0.008, Duration::zero()),
            incident(3, "fire", 0.0, 0.016, Duration::zero()),
        ];
        assert_eq!(
            compute_clusters(&incidents, now(), DEFAULT_CLUSTER_RADIUS).len(),
            2
        );
        let merged = compute_clusters_with(&Transitive, &incidents, now(), DEFAULT_CLUSTER_RADIUS);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].total_intensity - 27.0).abs() < 1e-12);
    }
}
