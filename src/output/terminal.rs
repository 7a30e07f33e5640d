// Colored terminal output for stem profiles and cluster results.
//
// This module handles all terminal-specific formatting: colors, tables,
// ranking footers. The main.rs display calls delegate here.

use colored::Colorize;

use crate::cluster::engine::ClusterOutcome;
use crate::profile::StemProfile;
use crate::report::{rank_clusters, ClusterSummary};

use super::{format_count, format_usd};

/// Display stem profiles as a table ranked by support.
pub fn display_stem_profiles(profiles: &[StemProfile], limit: usize) {
    if profiles.is_empty() {
        println!("No stems survived the support filter. Lower the threshold.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Stem Profiles ({} stems) ===", profiles.len()).bold()
    );
    println!();

    // Header
    println!(
        "  {:>4}  {:<16} {:>9}  {:>14}  {:>13}  {:>7}  {:>7}",
        "Rank".dimmed(),
        "Stem".dimmed(),
        "Support".dimmed(),
        "Property".dimmed(),
        "Crop".dimmed(),
        "Fatal".dimmed(),
        "Injury".dimmed(),
    );
    println!("  {}", "-".repeat(82).dimmed());

    let mut ranked: Vec<&StemProfile> = profiles.iter().collect();
    ranked.sort_by(|a, b| b.support.cmp(&a.support).then(a.stem.cmp(&b.stem)));

    for (i, profile) in ranked.iter().take(limit).enumerate() {
        println!(
            "  {:>4}. {:<16} {:>9}  {:>14}  {:>13}  {:>7.3}  {:>7.3}",
            i + 1,
            profile.stem,
            format_count(profile.support),
            format_usd(profile.means.property_damage),
            format_usd(profile.means.crop_damage),
            profile.means.fatalities,
            profile.means.injuries,
        );
    }

    if profiles.len() > limit {
        println!("  {}", format!("... {} more", profiles.len() - limit).dimmed());
    }
    println!();
}

/// Display cluster membership, one block per cluster.
pub fn display_clusters(outcome: &ClusterOutcome) {
    println!(
        "\n{}",
        format!(
            "=== Stem Clusters (k={}, {} linkage, {} metric) ===",
            outcome.params.k, outcome.params.linkage, outcome.params.metric
        )
        .bold()
    );
    println!();

    for cluster in &outcome.clusters {
        let header = format!("Cluster {} ({} stems)", cluster.id, cluster.stems.len());
        println!("  {}", colorize_cluster(cluster.id, &header));
        println!("    {}", cluster.stems.join(", ").dimmed());
    }
    println!();
}

/// Display per-cluster damage summaries with ranking footers.
pub fn display_cluster_summaries(summaries: &[ClusterSummary]) {
    if summaries.is_empty() {
        return;
    }

    println!("\n{}", "=== Cluster Damage Summary ===".bold());
    println!();

    // Header
    println!(
        "  {:>7}  {:>10}  {:>14}  {:>13}  {:>10}  {:>8}",
        "Cluster".dimmed(),
        "Rows".dimmed(),
        "Property".dimmed(),
        "Crop".dimmed(),
        "Fatalities".dimmed(),
        "Injuries".dimmed(),
    );
    println!("  {}", "-".repeat(74).dimmed());

    for summary in summaries {
        println!(
            "  {:>7}  {:>10}  {:>14}  {:>13}  {:>10.3}  {:>8.3}",
            summary.cluster,
            format_count(summary.rows),
            format_usd(summary.means.property_damage),
            format_usd(summary.means.crop_damage),
            summary.means.fatalities,
            summary.means.injuries,
        );
    }
    println!();

    // Ranking footers
    let deadliest = rank_clusters(summaries, |s| s.means.fatalities);
    if let Some(&top) = deadliest.first() {
        if let Some(summary) = summaries.iter().find(|s| s.cluster == top) {
            println!(
                "  {} cluster {} has the highest mean fatalities ({:.3})",
                "!!".red().bold(),
                top,
                summary.means.fatalities,
            );
        }
    }
    let costliest = rank_clusters(summaries, |s| s.means.property_damage);
    if let Some(&top) = costliest.first() {
        if let Some(summary) = summaries.iter().find(|s| s.cluster == top) {
            println!(
                "  {} cluster {} has the highest mean property damage ({})",
                "$".yellow(),
                top,
                format_usd(summary.means.property_damage),
            );
        }
    }
    println!();
}

/// Colorize a cluster header, cycling a fixed palette by id.
fn colorize_cluster(id: usize, text: &str) -> colored::ColoredString {
    match id % 6 {
        1 => text.red(),
        2 => text.yellow(),
        3 => text.green(),
        4 => text.cyan(),
        5 => text.blue(),
        _ => text.magenta(),
    }
}
