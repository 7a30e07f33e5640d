// End-to-end clustering run: storm-events CSV in, flat stem clusters out.
//
// Strategy: load and validate the CSV, stem every label while accumulating
// per-stem damage totals, filter by support, log-compress, then run the
// agglomerative merge loop and cut the tree. Everything after the load is
// deterministic, so two runs over the same file give identical clusters.

use std::path::Path;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cluster::engine::{cluster_stems, ClusterOutcome, ClusterParams};
use crate::profile::{StemProfile, StemTally};
use crate::records;
use crate::report::{expand_records, summarize_clusters, ClusterSummary};
use crate::text::stem::LabelStemmer;

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub record_count: usize,
    pub profiles: Vec<StemProfile>,
    pub clustering: ClusterOutcome,
    pub summaries: Vec<ClusterSummary>,
}

/// Run the full pipeline over one storm-events CSV.
///
/// `threshold` is the strict support cutoff for stems, `params` the
/// clustering knobs. Returns profiles, the cut tree, and per-cluster
/// summaries over the re-expanded record rows.
pub fn run(data_path: &Path, threshold: u64, params: &ClusterParams) -> Result<PipelineOutcome> {
    // Step 1: Load the record stream
    println!("Loading records from {}...", data_path.display());
    let records = records::load_records_file(data_path)?;
    info!(count = records.len(), "Records loaded");

    // Step 2: Stem labels and accumulate per-stem damage totals
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Stemming [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );
    let stemmer = LabelStemmer::new();
    let mut tally = StemTally::default();
    for record in &records {
        tally.absorb(&stemmer, record);
        pb.inc(1);
    }
    pb.finish_and_clear();
    println!("  {} distinct stems", tally.stem_count());

    // Step 3: Filter by support and log-compress
    let profiles = tally.into_profiles(threshold)?;
    println!(
        "  {} stems above support threshold {}",
        profiles.len(),
        threshold,
    );

    // Step 4: Cluster the surviving stems and cut the tree
    let clustering = cluster_stems(&profiles, params)?;
    println!(
        "  {} clusters ({} linkage, {} metric)",
        clustering.clusters.len(),
        params.linkage,
        params.metric,
    );

    // Step 5: Re-expand records against the assignments and summarize
    let rows = expand_records(&records, &stemmer, &clustering);
    let summaries = summarize_clusters(&rows, &clustering);

    Ok(PipelineOutcome {
        record_count: records.len(),
        profiles,
        clustering,
        summaries,
    })
}
