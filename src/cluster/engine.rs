// Agglomerative hierarchical clustering over stem profiles.
//
// The merge loop is the naive O(n^3) scan: find the closest pair of active
// clusters, merge, repeat until one remains. n is the number of stems that
// survived the support filter (dozens), so the simple scan beats carrying
// an indexed heap around.
//
// Dendrogram numbering follows the usual linkage-matrix convention: leaves
// are 0..n in stem order, and the cluster created by merge i gets id n + i.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::profile::StemProfile;

use super::distance::{pairwise_distances, DistanceMetric};

pub const DEFAULT_CLUSTER_COUNT: usize = 6;

/// How the distance between two multi-member clusters is derived from
/// point distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Farthest pair of members. Produces compact, similar-diameter groups.
    Complete,
    /// Nearest pair of members. Prone to chaining, kept for comparison runs.
    Single,
    /// Mean over all member pairs.
    Average,
}

impl Linkage {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "single" => Ok(Self::Single),
            "average" => Ok(Self::Average),
            other => bail!(
                "unknown linkage {other:?}; expected \"complete\", \"single\", or \"average\""
            ),
        }
    }

    fn between(&self, a: &[usize], b: &[usize], point_distances: &[Vec<f64>]) -> f64 {
        match self {
            Self::Complete => {
                let mut worst = 0.0_f64;
                for &i in a {
                    for &j in b {
                        worst = worst.max(point_distances[i][j]);
                    }
                }
                worst
            }
            Self::Single => {
                let mut nearest = f64::INFINITY;
                for &i in a {
                    for &j in b {
                        nearest = nearest.min(point_distances[i][j]);
                    }
                }
                nearest
            }
            Self::Average => {
                let mut total = 0.0;
                for &i in a {
                    for &j in b {
                        total += point_distances[i][j];
                    }
                }
                total / (a.len() * b.len()) as f64
            }
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Single => write!(f, "single"),
            Self::Average => write!(f, "average"),
        }
    }
}

/// One merge step in dendrogram numbering.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Member count of the cluster this merge creates.
    pub size: usize,
}

/// The full merge history of a clustering run.
#[derive(Debug, Clone, Serialize)]
pub struct Dendrogram {
    pub leaf_count: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    /// Cut the tree into `k` flat groups by replaying the first
    /// `leaf_count - k` merges. Each group is an ascending list of leaf
    /// indices; groups come back ordered by their smallest member.
    pub fn cut(&self, k: usize) -> Result<Vec<Vec<usize>>> {
        if k == 0 || k > self.leaf_count {
            bail!(
                "cannot cut {} leaves into {} clusters",
                self.leaf_count,
                k
            );
        }
        let steps = self.leaf_count - k;
        let mut members: BTreeMap<usize, Vec<usize>> =
            (0..self.leaf_count).map(|i| (i, vec![i])).collect();

        for (step, merge) in self.merges.iter().enumerate().take(steps) {
            let merged = match (members.remove(&merge.left), members.remove(&merge.right)) {
                (Some(mut left), Some(right)) => {
                    left.extend(right);
                    left.sort_unstable();
                    left
                }
                _ => bail!(
                    "merge {} references cluster ids {} and {}, one of which was already absorbed",
                    step,
                    merge.left,
                    merge.right
                ),
            };
            members.insert(self.leaf_count + step, merged);
        }

        let mut groups: Vec<Vec<usize>> = members.into_values().collect();
        groups.sort_by_key(|group| group.first().copied().unwrap_or(usize::MAX));
        Ok(groups)
    }

    /// Merge distances in merge order. Monotonically non-decreasing for the
    /// linkages implemented here.
    pub fn merge_distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}

/// Run the agglomeration to completion over a precomputed distance matrix.
///
/// Ties on distance go to the pair with the lowest (left, right) cluster
/// ids, so the merge order is a pure function of the input.
pub fn linkage_matrix(point_distances: &[Vec<f64>], linkage: Linkage) -> Vec<Merge> {
    let n = point_distances.len();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    let mut active: BTreeMap<usize, Vec<usize>> = (0..n).map(|i| (i, vec![i])).collect();

    for step in 0..n.saturating_sub(1) {
        let ids: Vec<usize> = active.keys().copied().collect();
        let mut best: Option<(f64, usize, usize)> = None;
        for (index, &a) in ids.iter().enumerate() {
            for &b in &ids[index + 1..] {
                let d = linkage.between(&active[&a], &active[&b], point_distances);
                let better = match best {
                    None => true,
                    Some((best_d, best_a, best_b)) => {
                        d < best_d || (d == best_d && (a, b) < (best_a, best_b))
                    }
                };
                if better {
                    best = Some((d, a, b));
                }
            }
        }

        let (distance, a, b) = match best {
            Some(found) => found,
            None => break,
        };

        let mut merged = Vec::new();
        merged.extend(active.remove(&a).unwrap_or_default());
        merged.extend(active.remove(&b).unwrap_or_default());
        merged.sort_unstable();

        debug!("merge {}: {} + {} at distance {:.4}", step, a, b, distance);
        merges.push(Merge {
            left: a,
            right: b,
            distance,
            size: merged.len(),
        });
        active.insert(n + step, merged);
    }

    merges
}

/// Tunable knobs for a clustering run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClusterParams {
    pub k: usize,
    pub metric: DistanceMetric,
    pub linkage: Linkage,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTER_COUNT,
            metric: DistanceMetric::Euclidean,
            linkage: Linkage::Complete,
        }
    }
}

/// One flat cluster after the cut. Ids run 1..=k, assigned by each
/// cluster's alphabetically first stem.
#[derive(Debug, Clone, Serialize)]
pub struct StemCluster {
    pub id: usize,
    pub stems: Vec<String>,
}

/// Everything a clustering run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterOutcome {
    pub params: ClusterParams,
    pub clusters: Vec<StemCluster>,
    /// stem -> cluster id, the flat mapping most consumers want.
    pub assignments: BTreeMap<String, usize>,
    pub dendrogram: Dendrogram,
}

/// Cluster stem profiles into `params.k` flat groups.
///
/// `profiles` must be sorted by stem (as `build_profiles` returns them);
/// leaf numbering and therefore the whole merge order depend on it.
pub fn cluster_stems(profiles: &[StemProfile], params: &ClusterParams) -> Result<ClusterOutcome> {
    let n = profiles.len();
    if params.k == 0 {
        bail!("cluster count must be at least 1");
    }
    if params.k > n {
        bail!(
            "cannot cut {} stems into {} clusters; lower --clusters or the support threshold",
            n,
            params.k
        );
    }
    if profiles.windows(2).any(|pair| pair[0].stem >= pair[1].stem) {
        bail!("stem profiles must be sorted by stem with no duplicates");
    }

    let points: Vec<[f64; 4]> = profiles.iter().map(|p| p.log_means.as_array()).collect();
    let distances = pairwise_distances(&points, params.metric);
    let merges = linkage_matrix(&distances, params.linkage);
    let dendrogram = Dendrogram {
        leaf_count: n,
        merges,
    };

    let groups = dendrogram.cut(params.k)?;

    let mut clusters = Vec::with_capacity(groups.len());
    let mut assignments = BTreeMap::new();
    for (index, group) in groups.iter().enumerate() {
        let id = index + 1;
        let stems: Vec<String> = group
            .iter()
            .map(|&leaf| profiles[leaf].stem.clone())
            .collect();
        for stem in &stems {
            assignments.insert(stem.clone(), id);
        }
        clusters.push(StemCluster { id, stems });
    }

    info!(
        "{} stems cut into {} clusters ({} linkage, {} metric)",
        n, params.k, params.linkage, params.metric
    );

    Ok(ClusterOutcome {
        params: *params,
        clusters,
        assignments,
        dendrogram,
    })
}
