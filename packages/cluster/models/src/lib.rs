#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cluster and hotspot result types.
//!
//! A [`Cluster`] is derived and ephemeral: it lives for one clustering pass
//! and is never persisted. A [`Hotspot`] is the summary of a multi-member
//! cluster as exposed to analytics consumers.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use urban_guardian_geo_models::LatLng;
use urban_guardian_incident_models::Incident;

/// A group of incidents found close together in one clustering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Arithmetic mean of the member positions.
    pub center: LatLng,
    /// Member incidents, in input order.
    pub members: Vec<Incident>,
    /// Sum of the members' severity/recency weights.
    pub total_intensity: f64,
    /// The most frequent type string among members.
    pub dominant_type: String,
}

impl Cluster {
    /// Number of member incidents.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if this cluster qualifies as a hotspot (more than
    /// one member).
    #[must_use]
    pub fn is_hotspot(&self) -> bool {
        self.count() > 1
    }

    /// Size tier for marker styling.
    #[must_use]
    pub fn size_tier(&self) -> ClusterSizeTier {
        ClusterSizeTier::for_count(self.count())
    }
}

/// Summary of a ranked cluster as exposed to analytics consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Number of incidents in the cluster.
    pub count: usize,
    /// The cluster's dominant type.
    pub most_common_type: String,
    /// The cluster centroid.
    pub center: LatLng,
    /// Sum of the members' weights.
    pub total_intensity: f64,
}

impl From<&Cluster> for Hotspot {
    fn from(cluster: &Cluster) -> Self {
        Self {
            count: cluster.count(),
            most_common_type: cluster.dominant_type.clone(),
            center: cluster.center,
            total_intensity: cluster.total_intensity,
        }
    }
}

/// Marker size tier by member count.
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
pub enum ClusterSizeTier {
    /// Fewer than 10 members.
    Small,
    /// 10 to 49 members.
    Medium,
    /// 50 or more members.
    Large,
}

impl ClusterSizeTier {
    /// Member count at which a cluster becomes [`ClusterSizeTier::Medium`].
    pub const MEDIUM_THRESHOLD: usize = 10;
    /// Member count at which a cluster becomes [`ClusterSizeTier::Large`].
    pub const LARGE_THRESHOLD: usize = 50;

    /// Returns the tier for a member count.
    #[must_use]
    pub const fn for_count(count: usize) -> Self {
        if count >= Self::LARGE_THRESHOLD {
            Self::Large
        } else if count >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Small
        }
    }
}
