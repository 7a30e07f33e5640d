use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// Nothing here is secret; env vars just keep file locations off the
/// command line. The .env file is loaded automatically at startup via
/// dotenvy.
pub struct Config {
    /// Path to the storm events CSV (STORMSTEM_DATA, default ./data/StormData.csv).
    pub data_path: PathBuf,
    /// Directory for reports and JSON exports (STORMSTEM_OUT, default ./out).
    pub out_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Both values have defaults, so a missing variable is never an error
    /// here; a missing file is caught by `resolve_input`.
    pub fn load() -> Result<Self> {
        Ok(Self {
            data_path: env::var("STORMSTEM_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/StormData.csv")),
            out_dir: env::var("STORMSTEM_OUT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./out")),
        })
    }

    /// Resolve the input CSV: an explicit --input flag wins over the
    /// environment. Call this before any operation that reads storm data.
    pub fn resolve_input(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        let path = flag.unwrap_or_else(|| self.data_path.clone());
        if !path.exists() {
            anyhow::bail!(
                "storm data file not found at {}.\n\
                 Pass --input <FILE> or set STORMSTEM_DATA in your .env file.",
                path.display()
            );
        }
        Ok(path)
    }
}
