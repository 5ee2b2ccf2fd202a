#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard analytics over an in-memory incident set.
//!
//! All functions are pure: they take the incident slice and an explicit
//! "now" and never touch a store.

use chrono::{DateTime, Duration, Utc};
use urban_guardian_cluster::{Hotspot, compute_clusters, rank_hotspots};
use urban_guardian_incident_models::Incident;

pub use urban_guardian_analytics_models::{AreaAnalytics, AreaTrends, TypeAnalytics, TypeCount};

/// Counts incidents per type, most frequent first.
///
/// Types are compared exactly as reported. Equal counts keep the order in
/// which the types first appear.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn type_breakdown(incidents: &[Incident]) -> TypeAnalytics {
    let mut counts: Vec<(&str, u64)> = Vec::new();
    for incident in incidents {
        if let Some(entry) = counts
            .iter_mut()
            .find(|entry| entry.0 == incident.incident_type)
        {
            entry.1 += 1;
        } else {
            counts.push((incident.incident_type.as_str(), 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total = incidents.len() as u64;
    let types: Vec<TypeCount> = counts
        .into_iter()
        .map(|(incident_type, count)| TypeCount {
            incident_type: incident_type.to_string(),
            count,
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    TypeAnalytics {
        total,
        most_reported: types.first().cloned(),
        types,
    }
}

/// Counts incidents reported in the last day and the last week.
///
/// Both windows are inclusive of their lower bound.
#[must_use]
pub fn area_trends(incidents: &[Incident], now: DateTime<Utc>) -> AreaTrends {
    let day_ago = now - Duration::days(1);
    let week_ago = now - Duration::days(7);

    incidents
        .iter()
        .fold(AreaTrends::default(), |mut trends, incident| {
            if incident.timestamp >= day_ago {
                trends.recent_24h += 1;
            }
            if incident.timestamp >= week_ago {
                trends.recent_7d += 1;
            }
            trends
        })
}

/// Recent trends plus the `top_n` largest multi-incident clusters.
#[must_use]
pub fn area_analytics(
    incidents: &[Incident],
    now: DateTime<Utc>,
    radius: f64,
    top_n: usize,
) -> AreaAnalytics {
    let clusters = compute_clusters(incidents, now, radius);
    let hotspots: Vec<Hotspot> = rank_hotspots(&clusters, top_n)
        .iter()
        .map(Hotspot::from)
        .collect();
    log::debug!(
        "Area analytics: {} clusters, {} hotspots",
        clusters.len(),
        hotspots.len()
    );

    AreaAnalytics {
        trends: area_trends(incidents, now),
        hotspots,
    }
}
