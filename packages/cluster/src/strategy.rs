//! Pluggable grouping strategies.
//!
//! A strategy only decides which positions belong together; aggregation
//! (centroid, intensity, dominant type) is shared and lives in the crate
//! root. Both strategies use [`within_radius`] (planar, inclusive) as the
//! neighbor test.

use std::collections::BTreeMap;

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};
use urban_guardian_geo::{LatLng, within_radius};

/// Groups positions into clusters.
///
/// Returns groups of indices into `positions`. Every index appears in
/// exactly one group, members of a group are in ascending order, and groups
/// are ordered by their first member.
pub trait ClusteringStrategy {
    /// Partitions `positions` into groups using the given radius (degrees).
    fn group(&self, positions: &[LatLng], radius: f64) -> Vec<Vec<usize>>;
}

/// Greedy single-pass clustering around seed incidents.
///
/// Walks positions in input order. Each position not yet assigned becomes a
/// seed and absorbs every later unassigned position within `radius` of the
/// seed itself (not of the evolving centroid). Grouping is therefore
/// order-dependent and non-transitive: if A-B and B-C are within radius but
/// A-C is not, C joins A's cluster only if it is within radius of A.
///
/// Cost is O(n²) distance checks. Fine for low thousands of incidents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedRadius;

impl ClusteringStrategy for SeedRadius {
    fn group(&self, positions: &[LatLng], radius: f64) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; positions.len()];
        let mut groups = Vec::new();

        for seed in 0..positions.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut members = vec![seed];

            for candidate in (seed + 1)..positions.len() {
                if !assigned[candidate]
                    && within_radius(positions[seed], positions[candidate], radius)
                {
                    assigned[candidate] = true;
                    members.push(candidate);
                }
            }

            groups.push(members);
        }

        groups
    }
}

/// Transitive (single-linkage) clustering.
///
/// Any two positions within `radius` of each other end up in the same
/// cluster, as do chains of such pairs. The result does not depend on input
/// order. Neighbor candidates come from an R-tree, so cost is roughly
/// O(n log n) for sparse data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transitive;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

impl ClusteringStrategy for Transitive {
    fn group(&self, positions: &[LatLng], radius: f64) -> Vec<Vec<usize>> {
        let tree: RTree<IndexedPoint> = RTree::bulk_load(
            positions
                .iter()
                .enumerate()
                .map(|(i, p)| IndexedPoint::new(p.to_xy(), i))
                .collect(),
        );

        // The R-tree compares squared distances, so widen the query slightly
        // and let `within_radius` make the exact inclusive decision.
        let query_radius = radius * (1.0 + 1e-9) + f64::EPSILON;
        let query_radius_sq = query_radius * query_radius;

        let mut sets = DisjointSets::new(positions.len());
        for (i, position) in positions.iter().enumerate() {
            for neighbor in tree.locate_within_distance(position.to_xy(), query_radius_sq) {
                let j = neighbor.data;
                if j > i && within_radius(*position, positions[j], radius) {
                    sets.union(i, j);
                }
            }
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..positions.len() {
            by_root.entry(sets.find(i)).or_default().push(i);
        }

        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        groups.sort_by_key(|members| members[0]);
        groups
    }
}

/// Union-find with path halving and union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}

/// Serializable strategy selector, used by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// [`SeedRadius`].
    #[default]
    SeedRadius,
    /// [`Transitive`].
    Transitive,
}

impl StrategyKind {
    /// Returns the strategy implementation for this selector.
    #[must_use]
    pub fn strategy(self) -> &'static dyn ClusteringStrategy {
        match self {
            Self::SeedRadius => &SeedRadius,
            Self::Transitive => &Transitive,
        }
    }
}
