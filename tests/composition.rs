// Composition tests — verifying that the pipeline stages chain together
// correctly.
//
// These tests exercise the data flow between modules:
//   CSV records -> stems -> profiles -> dendrogram -> cut -> summaries
// over small synthetic storm-event files. Filesystem side effects (CSV
// fixtures, JSON exports, report output) stay in /tmp.

use std::path::Path;

use stormstem::cluster::distance::DistanceMetric;
use stormstem::cluster::engine::{cluster_stems, ClusterParams, Linkage};
use stormstem::output::export::export_all;
use stormstem::output::markdown::{generate_report, write_report};
use stormstem::pipeline::{self, PipelineOutcome};
use stormstem::profile::build_profiles;
use stormstem::records::load_records;
use stormstem::report::{expand_records, summarize_clusters};
use stormstem::text::stem::LabelStemmer;

/// Build a storm-events CSV from (EVTYPE, PROPDMG, PROPDMGEXP, FATALITIES)
/// rows. REFNUM is the 1-based row number.
fn storm_csv(rows: &[(&str, f64, &str, u32)]) -> String {
    let mut out = String::from(
        "BGN_DATE,EVTYPE,FATALITIES,INJURIES,PROPDMG,PROPDMGEXP,CROPDMG,CROPDMGEXP,REFNUM\n",
    );
    for (i, (label, prop, exp, fatalities)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "4/18/1950 0:00:00,{label},{fatalities},0,{prop},{exp},0,,{}\n",
            i + 1
        ));
    }
    out
}

/// Three damage tiers, three records each per label: deadly but cheap
/// (TORNADO, HEAT), expensive (FLOOD, STORM), and near-harmless (FOG,
/// FROST). Every stem has support 3.
fn tier_rows() -> Vec<(&'static str, f64, &'static str, u32)> {
    let mut rows = Vec::new();
    for _ in 0..3 {
        rows.push(("TORNADO", 0.0, "", 5));
        rows.push(("HEAT", 0.0, "", 4));
        rows.push(("FLOOD", 100.0, "K", 0));
        rows.push(("STORM", 80.0, "K", 0));
        rows.push(("FOG", 0.1, "K", 0));
        rows.push(("FROST", 0.2, "K", 0));
    }
    rows
}

fn tier_params() -> ClusterParams {
    ClusterParams {
        k: 3,
        metric: DistanceMetric::Euclidean,
        linkage: Linkage::Complete,
    }
}

// ============================================================
// Chain: CSV -> records -> stems -> profiles
// ============================================================

#[test]
fn wind_variants_collapse_into_one_profile() {
    let csv = storm_csv(&[
        ("WIND", 1.0, "K", 0),
        ("WINDS", 2.0, "K", 0),
        ("HIGH WIND", 1.5, "K", 0),
    ]);
    let records = load_records(csv.as_bytes()).unwrap();
    let stemmer = LabelStemmer::new();
    let profiles = build_profiles(&records, &stemmer, 0).unwrap();

    let wind = profiles.iter().find(|p| p.stem == "wind").unwrap();
    assert_eq!(wind.support, 3);
    // Magnitude codes applied: (1000 + 2000 + 1500) / 3.
    assert!((wind.means.property_damage - 1500.0).abs() < 1e-9);
    assert!((wind.log_means.property_damage - 1500.01_f64.ln()).abs() < 1e-12);
}

// ============================================================
// Full pipeline over a CSV file
// ============================================================

#[test]
fn full_pipeline_groups_stems_by_damage_tier() {
    let tmp_path = "/tmp/stormstem_test_tiers.csv";
    std::fs::write(tmp_path, storm_csv(&tier_rows())).unwrap();

    let outcome = pipeline::run(Path::new(tmp_path), 2, &tier_params()).unwrap();

    assert_eq!(outcome.record_count, 18);
    let stems: Vec<&str> = outcome.profiles.iter().map(|p| p.stem.as_str()).collect();
    assert_eq!(stems, vec!["flood", "fog", "frost", "heat", "storm", "tornado"]);

    // Expensive, near-harmless, and deadly tiers come apart cleanly.
    assert_eq!(outcome.clustering.clusters[0].stems, vec!["flood", "storm"]);
    assert_eq!(outcome.clustering.clusters[1].stems, vec!["fog", "frost"]);
    assert_eq!(outcome.clustering.clusters[2].stems, vec!["heat", "tornado"]);

    // Summaries average over the expanded rows, not over the stem means.
    assert_eq!(outcome.summaries.len(), 3);
    assert_eq!(outcome.summaries[0].rows, 6);
    assert!((outcome.summaries[0].means.property_damage - 90_000.0).abs() < 1e-6);
    assert!((outcome.summaries[1].means.property_damage - 150.0).abs() < 1e-9);
    assert!((outcome.summaries[2].means.fatalities - 4.5).abs() < 1e-9);

    // Merge heights from real data never decrease under complete linkage.
    let heights = outcome.clustering.dendrogram.merge_distances();
    assert_eq!(heights.len(), 5);
    assert!(heights.windows(2).all(|w| w[0] <= w[1]));

    let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn record_spanning_clusters_counts_in_each_summary() {
    let mut rows = tier_rows();
    // One label carrying stems from two different clusters.
    rows.push(("FLOOD FOG", 1.0, "K", 0));
    let tmp_path = "/tmp/stormstem_test_duplication.csv";
    std::fs::write(tmp_path, storm_csv(&rows)).unwrap();

    let outcome = pipeline::run(Path::new(tmp_path), 2, &tier_params()).unwrap();

    assert_eq!(outcome.record_count, 19);
    assert_eq!(outcome.clustering.clusters[0].stems, vec!["flood", "storm"]);
    assert_eq!(outcome.clustering.clusters[1].stems, vec!["fog", "frost"]);

    // The FLOOD FOG record lands in both cluster 1 and cluster 2, so the
    // summary rows overlap and sum past the record count.
    assert_eq!(outcome.summaries[0].rows, 7);
    assert_eq!(outcome.summaries[1].rows, 7);
    assert_eq!(outcome.summaries[2].rows, 6);
    let total: u64 = outcome.summaries.iter().map(|s| s.rows).sum();
    assert_eq!(total, 20);

    let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn identical_inputs_give_identical_clusterings() {
    let tmp_path = "/tmp/stormstem_test_determinism.csv";
    std::fs::write(tmp_path, storm_csv(&tier_rows())).unwrap();

    let first = pipeline::run(Path::new(tmp_path), 2, &tier_params()).unwrap();
    let second = pipeline::run(Path::new(tmp_path), 2, &tier_params()).unwrap();

    assert_eq!(first.clustering.assignments, second.clustering.assignments);
    let merges = |outcome: &PipelineOutcome| {
        outcome
            .clustering
            .dendrogram
            .merges
            .iter()
            .map(|m| (m.left, m.right, m.distance.to_bits()))
            .collect::<Vec<_>>()
    };
    assert_eq!(merges(&first), merges(&second));

    let _ = std::fs::remove_file(tmp_path);
}

// ============================================================
// Failure modes surface through the pipeline
// ============================================================

#[test]
fn pipeline_rejects_more_clusters_than_stems() {
    let tmp_path = "/tmp/stormstem_test_too_many_clusters.csv";
    let rows = vec![
        ("WIND", 1.0, "K", 0),
        ("WIND", 1.0, "K", 0),
        ("WIND", 1.0, "K", 0),
        ("FLOOD", 2.0, "K", 0),
        ("FLOOD", 2.0, "K", 0),
        ("FLOOD", 2.0, "K", 0),
    ];
    std::fs::write(tmp_path, storm_csv(&rows)).unwrap();

    let err = pipeline::run(Path::new(tmp_path), 2, &ClusterParams::default()).unwrap_err();
    assert!(err.to_string().contains("--clusters"), "got: {err}");

    let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn pipeline_requires_two_surviving_stems() {
    let tmp_path = "/tmp/stormstem_test_sparse.csv";
    let rows = vec![
        ("WIND", 1.0, "K", 0),
        ("WIND", 1.0, "K", 0),
        ("WIND", 1.0, "K", 0),
        ("FLOOD", 2.0, "K", 0),
    ];
    std::fs::write(tmp_path, storm_csv(&rows)).unwrap();

    let err = pipeline::run(Path::new(tmp_path), 2, &tier_params()).unwrap_err();
    assert!(err.to_string().contains("support threshold"), "got: {err}");

    let _ = std::fs::remove_file(tmp_path);
}

// ============================================================
// Exports and the run report
// ============================================================

#[test]
fn export_files_carry_the_full_outcome() {
    let records = load_records(storm_csv(&tier_rows()).as_bytes()).unwrap();
    let stemmer = LabelStemmer::new();
    let profiles = build_profiles(&records, &stemmer, 2).unwrap();
    let outcome = cluster_stems(&profiles, &tier_params()).unwrap();

    let out_dir = Path::new("/tmp/stormstem_test_export_out");
    export_all(out_dir, &profiles, &outcome).unwrap();

    let assignments: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("assignments.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(assignments["params"]["k"], 3);
    assert_eq!(assignments["params"]["metric"], "euclidean");
    assert_eq!(assignments["params"]["linkage"], "complete");
    assert_eq!(assignments["clusters"].as_array().unwrap().len(), 3);
    assert_eq!(assignments["profiles"].as_array().unwrap().len(), 6);
    assert_eq!(assignments["assignments"]["flood"], 1);
    assert_eq!(assignments["assignments"]["tornado"], 3);

    let dendrogram: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("dendrogram.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(dendrogram["leaf_count"], 6);
    let leaves: Vec<&str> = dendrogram["leaves"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(leaves, vec!["flood", "fog", "frost", "heat", "storm", "tornado"]);
    assert_eq!(dendrogram["merges"].as_array().unwrap().len(), 5);

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn report_covers_every_section() {
    let records = load_records(storm_csv(&tier_rows()).as_bytes()).unwrap();
    let stemmer = LabelStemmer::new();
    let profiles = build_profiles(&records, &stemmer, 2).unwrap();
    let clustering = cluster_stems(&profiles, &tier_params()).unwrap();
    let rows = expand_records(&records, &stemmer, &clustering);
    let summaries = summarize_clusters(&rows, &clustering);
    let outcome = PipelineOutcome {
        record_count: records.len(),
        profiles,
        clustering,
        summaries,
    };

    let data_path = Path::new("data/StormData.csv");
    let report = generate_report(&outcome, data_path, 2).unwrap();
    for section in [
        "# Storm event stem clusters",
        "## Parameters",
        "## Stem profiles",
        "## Clusters",
        "### Cluster 1 (2 stems)",
        "## Cluster damage summary",
        "## Rankings",
        "## Caveats",
    ] {
        assert!(report.contains(section), "report is missing {section:?}");
    }
    assert!(report.contains("support threshold: 2"));
    assert!(report.contains("| flood |"));
    // Deadliest ranking puts the tornado/heat cluster first.
    assert!(report.contains("By mean fatalities: cluster 3"));

    let tmp_path = "/tmp/stormstem_test_report.md";
    write_report(Path::new(tmp_path), &outcome, data_path, 2).unwrap();
    let written = std::fs::read_to_string(tmp_path).unwrap();
    assert!(written.contains("# Storm event stem clusters"));
    let _ = std::fs::remove_file(tmp_path);
}
