// Markdown run report.
//
// One self-contained document per run: parameters, surviving stem profiles,
// cluster membership, per-cluster damage summaries, rankings, and caveats.
// Written for humans skimming results, not for machines.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::pipeline::PipelineOutcome;
use crate::report::rank_clusters;

use super::{format_count, format_usd};

/// Render the full report for one pipeline run.
pub fn generate_report(
    outcome: &PipelineOutcome,
    data_path: &Path,
    threshold: u64,
) -> Result<String> {
    let mut out = String::new();
    let params = &outcome.clustering.params;

    writeln!(out, "# Storm event stem clusters")?;
    writeln!(out)?;
    writeln!(
        out,
        "Generated {} over `{}` ({} records).",
        Local::now().format("%Y-%m-%d %H:%M"),
        data_path.display(),
        format_count(outcome.record_count as u64),
    )?;
    writeln!(out)?;

    writeln!(out, "## Parameters")?;
    writeln!(out)?;
    writeln!(out, "- support threshold: {threshold} (strictly greater than)")?;
    writeln!(out, "- clusters: {}", params.k)?;
    writeln!(out, "- metric: {}", params.metric)?;
    writeln!(out, "- linkage: {}", params.linkage)?;
    writeln!(out)?;

    writeln!(out, "## Stem profiles")?;
    writeln!(out)?;
    writeln!(
        out,
        "| stem | support | mean property | mean crop | mean fatalities | mean injuries |"
    )?;
    writeln!(out, "|---|---:|---:|---:|---:|---:|")?;
    let mut ranked: Vec<_> = outcome.profiles.iter().collect();
    ranked.sort_by(|a, b| b.support.cmp(&a.support).then(a.stem.cmp(&b.stem)));
    for profile in ranked {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.3} | {:.3} |",
            profile.stem,
            format_count(profile.support),
            format_usd(profile.means.property_damage),
            format_usd(profile.means.crop_damage),
            profile.means.fatalities,
            profile.means.injuries,
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Clusters")?;
    writeln!(out)?;
    for cluster in &outcome.clustering.clusters {
        writeln!(
            out,
            "### Cluster {} ({} stems)",
            cluster.id,
            cluster.stems.len()
        )?;
        writeln!(out)?;
        writeln!(out, "{}", cluster.stems.join(", "))?;
        writeln!(out)?;
    }

    writeln!(out, "## Cluster damage summary")?;
    writeln!(out)?;
    writeln!(
        out,
        "| cluster | rows | mean property | mean crop | mean fatalities | mean injuries |"
    )?;
    writeln!(out, "|---:|---:|---:|---:|---:|---:|")?;
    for summary in &outcome.summaries {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.3} | {:.3} |",
            summary.cluster,
            format_count(summary.rows),
            format_usd(summary.means.property_damage),
            format_usd(summary.means.crop_damage),
            summary.means.fatalities,
            summary.means.injuries,
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Rankings")?;
    writeln!(out)?;
    let deadliest = rank_clusters(&outcome.summaries, |s| s.means.fatalities);
    writeln!(
        out,
        "- By mean fatalities: {}",
        deadliest
            .iter()
            .map(|id| format!("cluster {id}"))
            .collect::<Vec<_>>()
            .join(", ")
    )?;
    let costliest = rank_clusters(&outcome.summaries, |s| s.means.property_damage);
    writeln!(
        out,
        "- By mean property damage: {}",
        costliest
            .iter()
            .map(|id| format!("cluster {id}"))
            .collect::<Vec<_>>()
            .join(", ")
    )?;
    writeln!(out)?;

    writeln!(out, "## Caveats")?;
    writeln!(out)?;
    writeln!(
        out,
        "- Summaries count a record once per surviving stem in its label, so \
         multi-stem records are duplicated and cluster rows do not sum to the \
         record count."
    )?;
    writeln!(
        out,
        "- Stems appearing in {threshold} or fewer records are excluded before \
         clustering; their records still count toward any surviving stems they share."
    )?;
    writeln!(
        out,
        "- Damage exponent codes other than K, M, and B are treated as a zero \
         multiplier, matching how the source data is usually read."
    )?;

    Ok(out)
}

/// Render the report and write it to `path`.
pub fn write_report(
    path: &Path,
    outcome: &PipelineOutcome,
    data_path: &Path,
    threshold: u64,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let report = generate_report(outcome, data_path, threshold)?;
    fs::write(path, report).with_context(|| format!("failed to write {}", path.display()))
}
