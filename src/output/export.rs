// JSON export of cluster assignments and the merge tree.
//
// Two files per run: assignments.json with the flat stem -> cluster map and
// per-stem profiles, and dendrogram.json with the full merge history. Leaf
// ids in the merge history index into the "leaves" array.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::cluster::engine::ClusterOutcome;
use crate::profile::StemProfile;

/// Write both export files into `out_dir`, creating it if needed.
pub fn export_all(
    out_dir: &Path,
    profiles: &[StemProfile],
    outcome: &ClusterOutcome,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    write_json(&out_dir.join("assignments.json"), &assignments_doc(profiles, outcome))?;
    write_json(&out_dir.join("dendrogram.json"), &dendrogram_doc(profiles, outcome))?;

    info!(dir = %out_dir.display(), "Exported assignments.json and dendrogram.json");
    Ok(())
}

fn assignments_doc(profiles: &[StemProfile], outcome: &ClusterOutcome) -> serde_json::Value {
    json!({
        "params": outcome.params,
        "clusters": outcome.clusters,
        "assignments": outcome.assignments,
        "profiles": profiles,
    })
}

fn dendrogram_doc(profiles: &[StemProfile], outcome: &ClusterOutcome) -> serde_json::Value {
    let leaves: Vec<&str> = profiles.iter().map(|p| p.stem.as_str()).collect();
    json!({
        "leaf_count": outcome.dendrogram.leaf_count,
        "leaves": leaves,
        "merges": outcome.dendrogram.merges,
    })
}

fn write_json<T: ?Sized + Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("failed to write {}", path.display()))
}
