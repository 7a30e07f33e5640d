use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use stormstem::cluster::distance::DistanceMetric;
use stormstem::cluster::engine::{ClusterParams, Linkage};

mod config;

/// Stormstem: clustering storm event types by damage profile.
///
/// Stems the free-text event-type labels in a storm events CSV, aggregates
/// damage per stem, and groups stems with similar damage profiles.
#[derive(Parser)]
#[command(name = "stormstem", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank stem damage profiles without clustering
    Stems {
        /// Path to the storm events CSV (overrides STORMSTEM_DATA)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Keep stems seen in strictly more than this many records (default: 50)
        #[arg(long, default_value = "50")]
        threshold: u64,

        /// How many stems to show (default: 25)
        #[arg(long, default_value = "25")]
        limit: usize,
    },

    /// Cluster stems by damage profile and show the groups
    Cluster {
        /// Path to the storm events CSV (overrides STORMSTEM_DATA)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Keep stems seen in strictly more than this many records (default: 50)
        #[arg(long, default_value = "50")]
        threshold: u64,

        /// Number of flat clusters to cut (default: 6)
        #[arg(long, default_value = "6")]
        clusters: usize,

        /// Distance metric: euclidean or manhattan (default: euclidean)
        #[arg(long, default_value = "euclidean")]
        metric: String,

        /// Linkage: complete, single, or average (default: complete)
        #[arg(long, default_value = "complete")]
        linkage: String,

        /// Write a markdown report into the output directory
        #[arg(long)]
        report: bool,

        /// Write assignments.json and dendrogram.json into the output directory
        #[arg(long)]
        export: bool,
    },

    /// Show how one event-type label normalizes and stems
    Tokens {
        /// The raw label, e.g. "TSTM WIND/HAIL"
        label: String,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stormstem=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stems {
            input,
            threshold,
            limit,
        } => {
            let config = config::Config::load()?;
            let data_path = config.resolve_input(input)?;

            println!("Loading records from {}...", data_path.display());
            let records = stormstem::records::load_records_file(&data_path)?;
            info!(count = records.len(), "Records loaded");

            let stemmer = stormstem::text::stem::LabelStemmer::new();
            let profiles = stormstem::profile::build_profiles(&records, &stemmer, threshold)?;
            stormstem::output::terminal::display_stem_profiles(&profiles, limit);
            println!(
                "{}",
                "To group these by damage profile, run: cargo run -- cluster".dimmed()
            );
        }

        Commands::Cluster {
            input,
            threshold,
            clusters,
            metric,
            linkage,
            report,
            export,
        } => {
            let config = config::Config::load()?;
            let data_path = config.resolve_input(input)?;
            let params = ClusterParams {
                k: clusters,
                metric: DistanceMetric::parse(&metric)?,
                linkage: Linkage::parse(&linkage)?,
            };

            let outcome = stormstem::pipeline::run(&data_path, threshold, &params)?;

            stormstem::output::terminal::display_clusters(&outcome.clustering);
            stormstem::output::terminal::display_cluster_summaries(&outcome.summaries);

            if report {
                let path = config.out_dir.join("report.md");
                stormstem::output::markdown::write_report(&path, &outcome, &data_path, threshold)?;
                println!("Report written to {}", path.display());
            }
            if export {
                stormstem::output::export::export_all(
                    &config.out_dir,
                    &outcome.profiles,
                    &outcome.clustering,
                )?;
                println!("Exports written to {}", config.out_dir.display());
            }
        }

        Commands::Tokens { label } => {
            let tokens = stormstem::text::normalize::normalize_label(&label);
            let stemmer = stormstem::text::stem::LabelStemmer::new();
            let stems = stemmer.stem_label(&label);

            println!("\n{}", format!("=== Tokens for {label:?} ===").bold());
            if tokens.is_empty() {
                println!("  (no tokens; the label is all digits and punctuation)");
            } else {
                println!("  tokens: {}", tokens.join(", "));
                println!(
                    "  stems:  {}",
                    stems.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
            println!();
        }
    }

    Ok(())
}
