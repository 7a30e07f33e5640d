// Storm-events CSV loader.
//
// Parses the NOAA storm-events export into typed `Record`s. The raw file
// carries damage amounts split into a mantissa column (PROPDMG/CROPDMG)
// and a magnitude-code column (PROPDMGEXP/CROPDMGEXP: K, M, or B); the
// loader decodes the codes and hands downstream stages already-scaled
// dollar amounts.
//
// The file has 37 columns; only the ones below matter here. Extra columns
// are ignored, a missing required column is a schema error up front.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

/// Columns the pipeline cannot run without. Checked against the header row
/// before any record is parsed, so a renamed or truncated export fails with
/// a schema error instead of skewing the aggregation with defaults.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "REFNUM",
    "EVTYPE",
    "FATALITIES",
    "INJURIES",
    "PROPDMG",
    "PROPDMGEXP",
    "CROPDMG",
    "CROPDMGEXP",
];

/// One row of the raw CSV, column names as NOAA ships them.
///
/// Numeric fields are deserialized as f64 because the export formats some
/// integer columns with decimals ("0.00"); `into_record` converts and
/// validates.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEventRow {
    #[serde(rename = "REFNUM")]
    pub refnum: f64,
    #[serde(rename = "BGN_DATE", default)]
    pub begin_date: Option<String>,
    #[serde(rename = "EVTYPE")]
    pub event_type: String,
    #[serde(rename = "FATALITIES")]
    pub fatalities: f64,
    #[serde(rename = "INJURIES")]
    pub injuries: f64,
    #[serde(rename = "PROPDMG")]
    pub property_damage: f64,
    #[serde(rename = "PROPDMGEXP", default)]
    pub property_magnitude: String,
    #[serde(rename = "CROPDMG")]
    pub crop_damage: f64,
    #[serde(rename = "CROPDMGEXP", default)]
    pub crop_magnitude: String,
}

/// One weather-event observation, immutable once loaded.
///
/// Damage amounts are in plain dollars (magnitude codes already applied).
/// `begin_date` is informational only — the clustering pipeline never reads
/// it, and a malformed date in the source becomes `None` rather than an
/// error.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: u64,
    pub label: String,
    pub begin_date: Option<NaiveDate>,
    pub property_damage: f64,
    pub crop_damage: f64,
    pub fatalities: u32,
    pub injuries: u32,
}

/// Decode a damage magnitude code into a multiplier.
///
/// `K` → 1e3, `M` → 1e6, `B` → 1e9, case-insensitive. Everything else —
/// blank, digits, the stray `+`/`-`/`?` codes in the 1990s data — decodes
/// to 0, matching the original analysis.
pub fn magnitude_multiplier(code: &str) -> f64 {
    match code.trim().to_ascii_uppercase().as_str() {
        "K" => 1e3,
        "M" => 1e6,
        "B" => 1e9,
        _ => 0.0,
    }
}

impl RawEventRow {
    /// Convert to a typed `Record`, scaling damages and validating signs.
    ///
    /// Negative amounts or counts fail fast: clamping them would silently
    /// skew the per-stem means.
    pub fn into_record(self) -> Result<Record> {
        if self.refnum < 0.0 {
            bail!("negative REFNUM {}", self.refnum);
        }
        let id = self.refnum as u64;

        if self.property_damage < 0.0 || self.crop_damage < 0.0 {
            bail!(
                "record {id}: negative damage amount (PROPDMG={}, CROPDMG={})",
                self.property_damage,
                self.crop_damage
            );
        }
        if self.fatalities < 0.0 || self.injuries < 0.0 {
            bail!(
                "record {id}: negative casualty count (FATALITIES={}, INJURIES={})",
                self.fatalities,
                self.injuries
            );
        }

        Ok(Record {
            id,
            label: self.event_type,
            begin_date: self.begin_date.as_deref().and_then(parse_begin_date),
            property_damage: self.property_damage
                * magnitude_multiplier(&self.property_magnitude),
            crop_damage: self.crop_damage * magnitude_multiplier(&self.crop_magnitude),
            fatalities: self.fatalities.round() as u32,
            injuries: self.injuries.round() as u32,
        })
    }
}

/// Parse the `BGN_DATE` format ("4/18/1950 0:00:00"). Anything that does
/// not match is treated as missing, per the tolerance rule for upstream
/// date fields.
fn parse_begin_date(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw.trim(), "%m/%d/%Y %H:%M:%S")
        .map(|dt| dt.date())
        .ok()
}

/// Load records from any CSV reader.
///
/// Validates the header row first, then parses rows one by one; the first
/// malformed row aborts the load with its line number.
pub fn load_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    validate_headers(csv_reader.headers().context("reading CSV header row")?)?;

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        // +2: 1-based line numbers, plus the header row
        let raw: RawEventRow =
            result.with_context(|| format!("CSV parse error at line {}", line_num + 2))?;
        let record = raw
            .into_record()
            .with_context(|| format!("invalid values at line {}", line_num + 2))?;
        records.push(record);
    }

    debug!(count = records.len(), "Loaded storm event records");
    Ok(records)
}

/// Load records from a CSV file path.
pub fn load_records_file(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open storm data file '{}'", path.display()))?;
    load_records(file)
}

fn validate_headers(headers: &csv::StringRecord) -> Result<()> {
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.contains(col))
        .collect();

    if !missing.is_empty() {
        bail!(
            "storm data CSV is missing required column(s): {}.\n\
             Expected a NOAA storm-events export with at least: {}",
            missing.join(", "),
            REQUIRED_COLUMNS.join(", ")
        );
    }
    Ok(())
}
