#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics result types.
//!
//! These serialize to the camelCase shapes dashboards consume.

use serde::{Deserialize, Serialize};
pub use urban_guardian_cluster_models::Hotspot;

/// Number of incidents of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    /// The type string as reported.
    #[serde(rename = "type")]
    pub incident_type: String,
    /// Incidents of this type.
    pub count: u64,
    /// Share of all incidents, in percent.
    pub percentage: f64,
}

/// Breakdown of an incident set by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAnalytics {
    /// Total incidents.
    pub total: u64,
    /// The most frequent type, `None` for an empty set.
    pub most_reported: Option<TypeCount>,
    /// Every type, most frequent first.
    pub types: Vec<TypeCount>,
}

/// Recent activity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTrends {
    /// Incidents reported in the last 24 hours.
    #[serde(rename = "recent24h")]
    pub recent_24h: u64,
    /// Incidents reported in the last 7 days.
    #[serde(rename = "recent7d")]
    pub recent_7d: u64,
}

/// Recent activity plus the largest clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaAnalytics {
    /// Recent report counts.
    pub trends: AreaTrends,
    /// Largest clusters, biggest first.
    pub hotspots: Vec<Hotspot>,
}
