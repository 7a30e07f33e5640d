// Joining cluster assignments back onto the record stream.
//
// Aggregation happened per stem, so the join re-expands each record into
// one row per surviving stem, damage fields repeated on each row. A record
// whose label carries several surviving stems is counted once per stem in
// the summaries; the row counts overlap across clusters and can sum past
// the record count. That duplication is reported as-is.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cluster::engine::ClusterOutcome;
use crate::profile::DamageVector;
use crate::records::Record;
use crate::text::stem::LabelStemmer;

/// One (record, stem) pair after the cut. A record with N surviving stems
/// contributes N of these; a record with every stem filtered out
/// contributes none.
#[derive(Debug, Clone, Serialize)]
pub struct ClusteredRecord {
    pub record_id: u64,
    pub stem: String,
    pub cluster: usize,
    pub property_damage: f64,
    pub crop_damage: f64,
    pub fatalities: u32,
    pub injuries: u32,
}

/// Expand records into per-(record, stem) rows, in record order then stem
/// order. Stems that did not survive the support filter produce no row.
pub fn expand_records(
    records: &[Record],
    stemmer: &LabelStemmer,
    outcome: &ClusterOutcome,
) -> Vec<ClusteredRecord> {
    let mut rows = Vec::new();
    for record in records {
        for stem in stemmer.stem_label(&record.label) {
            if let Some(&cluster) = outcome.assignments.get(&stem) {
                rows.push(ClusteredRecord {
                    record_id: record.id,
                    stem,
                    cluster,
                    property_damage: record.property_damage,
                    crop_damage: record.crop_damage,
                    fatalities: record.fatalities,
                    injuries: record.injuries,
                });
            }
        }
    }
    rows
}

/// Per-cluster aggregate over the expanded rows.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub stems: Vec<String>,
    /// Expanded (record, stem) rows in this cluster. A record is counted
    /// once per stem of its label that landed here.
    pub rows: u64,
    pub means: DamageVector,
}

#[derive(Default)]
struct ClusterAccumulator {
    rows: u64,
    totals: DamageVector,
}

/// Summarize each cluster over the expanded rows, ordered by cluster id.
pub fn summarize_clusters(
    rows: &[ClusteredRecord],
    outcome: &ClusterOutcome,
) -> Vec<ClusterSummary> {
    let mut accumulators: BTreeMap<usize, ClusterAccumulator> = BTreeMap::new();

    for row in rows {
        let acc = accumulators.entry(row.cluster).or_default();
        acc.rows += 1;
        acc.totals.property_damage += row.property_damage;
        acc.totals.crop_damage += row.crop_damage;
        acc.totals.fatalities += f64::from(row.fatalities);
        acc.totals.injuries += f64::from(row.injuries);
    }

    outcome
        .clusters
        .iter()
        .map(|cluster| {
            let acc = accumulators.remove(&cluster.id).unwrap_or_default();
            let means = if acc.rows == 0 {
                DamageVector::default()
            } else {
                let n = acc.rows as f64;
                DamageVector {
                    property_damage: acc.totals.property_damage / n,
                    crop_damage: acc.totals.crop_damage / n,
                    fatalities: acc.totals.fatalities / n,
                    injuries: acc.totals.injuries / n,
                }
            };
            ClusterSummary {
                cluster: cluster.id,
                stems: cluster.stems.clone(),
                rows: acc.rows,
                means,
            }
        })
        .collect()
}

/// Cluster ids ordered by `key` descending; ties keep ascending id.
pub fn rank_clusters<F>(summaries: &[ClusterSummary], key: F) -> Vec<usize>
where
    F: Fn(&ClusterSummary) -> f64,
{
    let mut order: Vec<&ClusterSummary> = summaries.iter().collect();
    order.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cluster.cmp(&b.cluster))
    });
    order.into_iter().map(|summary| summary.cluster).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::DistanceMetric;
    use crate::cluster::engine::{ClusterParams, Dendrogram, Linkage, StemCluster};

    fn record(id: u64, label: &str, prop: f64, fat: u32) -> Record {
        Record {
            id,
            label: label.to_string(),
            begin_date: None,
            property_damage: prop,
            crop_damage: 0.0,
            fatalities: fat,
            injuries: 0,
        }
    }

    fn outcome(groups: &[(usize, &[&str])]) -> ClusterOutcome {
        let mut clusters = Vec::new();
        let mut assignments = BTreeMap::new();
        for &(id, stems) in groups {
            let stems: Vec<String> = stems.iter().map(|s| s.to_string()).collect();
            for stem in &stems {
                assignments.insert(stem.clone(), id);
            }
            clusters.push(StemCluster { id, stems });
        }
        ClusterOutcome {
            params: ClusterParams {
                k: groups.len(),
                metric: DistanceMetric::Euclidean,
                linkage: Linkage::Complete,
            },
            clusters,
            assignments,
            dendrogram: Dendrogram {
                leaf_count: 0,
                merges: Vec::new(),
            },
        }
    }

    #[test]
    fn record_spanning_two_clusters_lands_in_both() {
        let records = vec![record(7, "WIND FLOOD", 100.0, 1)];
        let stemmer = LabelStemmer::new();
        let outcome = outcome(&[(1, &["flood"]), (2, &["wind"])]);

        let rows = expand_records(&records, &stemmer, &outcome);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stem, "flood");
        assert_eq!(rows[0].cluster, 1);
        assert_eq!(rows[1].stem, "wind");
        assert_eq!(rows[1].cluster, 2);

        let summaries = summarize_clusters(&rows, &outcome);
        assert_eq!(summaries[0].rows, 1);
        assert_eq!(summaries[1].rows, 1);
        assert!((summaries[0].means.property_damage - 100.0).abs() < 1e-9);
        assert!((summaries[1].means.property_damage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn two_stems_in_one_cluster_count_the_record_twice() {
        let records = vec![record(3, "THUNDERSTORM WIND", 50.0, 1)];
        let stemmer = LabelStemmer::new();
        let outcome = outcome(&[(1, &["thunderstorm", "wind"])]);

        let rows = expand_records(&records, &stemmer, &outcome);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.record_id == 3 && row.cluster == 1));

        // Both rows carry the record's values, so the mean is unchanged
        // but the row count doubles.
        let summaries = summarize_clusters(&rows, &outcome);
        assert_eq!(summaries[0].rows, 2);
        assert!((summaries[0].means.property_damage - 50.0).abs() < 1e-9);
        assert!((summaries[0].means.fatalities - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unassigned_stems_drop_out_of_the_expansion() {
        let records = vec![record(1, "RARE EVENT WIND", 10.0, 0)];
        let stemmer = LabelStemmer::new();
        // Only "wind" survived the support filter.
        let outcome = outcome(&[(1, &["wind"])]);

        let rows = expand_records(&records, &stemmer, &outcome);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stem, "wind");
    }

    #[test]
    fn summaries_average_over_expanded_rows() {
        let records = vec![
            record(1, "WIND", 100.0, 2),
            record(2, "WINDS", 300.0, 0),
            record(3, "FLOOD", 900.0, 1),
        ];
        let stemmer = LabelStemmer::new();
        let outcome = outcome(&[(1, &["flood"]), (2, &["wind"])]);

        let rows = expand_records(&records, &stemmer, &outcome);
        let summaries = summarize_clusters(&rows, &outcome);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].cluster, 1);
        assert_eq!(summaries[0].rows, 1);
        assert!((summaries[0].means.property_damage - 900.0).abs() < 1e-9);
        assert_eq!(summaries[1].rows, 2);
        assert!((summaries[1].means.property_damage - 200.0).abs() < 1e-9);
        assert!((summaries[1].means.fatalities - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_is_descending_with_ties_by_id() {
        let summaries = vec![
            ClusterSummary {
                cluster: 1,
                stems: vec![],
                rows: 1,
                means: DamageVector {
                    fatalities: 2.0,
                    ..DamageVector::default()
                },
            },
            ClusterSummary {
                cluster: 2,
                stems: vec![],
                rows: 1,
                means: DamageVector {
                    fatalities: 5.0,
                    ..DamageVector::default()
                },
            },
            ClusterSummary {
                cluster: 3,
                stems: vec![],
                rows: 1,
                means: DamageVector {
                    fatalities: 2.0,
                    ..DamageVector::default()
                },
            },
        ];
        let order = rank_clusters(&summaries, |s| s.means.fatalities);
        assert_eq!(order, vec![2, 1, 3]);
    }
}
