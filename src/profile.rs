// Per-stem damage aggregation.
//
// Every record contributes its damage numbers once to each distinct stem in
// its label. Stems seen in too few records are dropped before clustering so
// a single freak report cannot anchor its own cluster.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;

use crate::records::Record;
use crate::text::stem::LabelStemmer;

/// Additive offset applied before the log transform so zero means stay finite.
pub const LOG_OFFSET: f64 = 0.01;

/// Minimum record support a stem needs (strictly greater than) to survive.
pub const DEFAULT_SUPPORT_THRESHOLD: u64 = 50;

/// The four damage dimensions tracked per stem.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DamageVector {
    pub property_damage: f64,
    pub crop_damage: f64,
    pub fatalities: f64,
    pub injuries: f64,
}

impl DamageVector {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.property_damage,
            self.crop_damage,
            self.fatalities,
            self.injuries,
        ]
    }

    /// ln(x + 0.01) on every component. Damage means span nine orders of
    /// magnitude; without compression the property-damage axis would decide
    /// every distance on its own.
    pub fn log_compressed(&self) -> DamageVector {
        DamageVector {
            property_damage: (self.property_damage + LOG_OFFSET).ln(),
            crop_damage: (self.crop_damage + LOG_OFFSET).ln(),
            fatalities: (self.fatalities + LOG_OFFSET).ln(),
            injuries: (self.injuries + LOG_OFFSET).ln(),
        }
    }
}

/// Aggregated damage profile for one stem.
#[derive(Debug, Clone, Serialize)]
pub struct StemProfile {
    /// The stem itself ("wind", "flood", ...).
    pub stem: String,
    /// Number of records whose label produced this stem.
    pub support: u64,
    /// Per-record means in original units (dollars, counts).
    pub means: DamageVector,
    /// Log-compressed means, the coordinates used for clustering.
    pub log_means: DamageVector,
}

#[derive(Default)]
struct StemAccumulator {
    count: u64,
    totals: DamageVector,
}

impl StemAccumulator {
    fn absorb(&mut self, record: &Record) {
        self.count += 1;
        self.totals.property_damage += record.property_damage;
        self.totals.crop_damage += record.crop_damage;
        self.totals.fatalities += f64::from(record.fatalities);
        self.totals.injuries += f64::from(record.injuries);
    }

    fn into_profile(self, stem: String) -> StemProfile {
        let n = self.count as f64;
        let means = DamageVector {
            property_damage: self.totals.property_damage / n,
            crop_damage: self.totals.crop_damage / n,
            fatalities: self.totals.fatalities / n,
            injuries: self.totals.injuries / n,
        };
        StemProfile {
            stem,
            support: self.count,
            log_means: means.log_compressed(),
            means,
        }
    }
}

/// Running per-stem totals. The pipeline feeds records in one at a time so
/// it can drive a progress bar; `build_profiles` wraps the same loop for
/// callers that don't need one.
#[derive(Default)]
pub struct StemTally {
    accumulators: BTreeMap<String, StemAccumulator>,
}

impl StemTally {
    /// Fold one record into the totals of every distinct stem in its label.
    pub fn absorb(&mut self, stemmer: &LabelStemmer, record: &Record) {
        for stem in stemmer.stem_label(&record.label) {
            self.accumulators.entry(stem).or_default().absorb(record);
        }
    }

    /// Distinct stems seen so far, filtered or not.
    pub fn stem_count(&self) -> usize {
        self.accumulators.len()
    }

    /// Keep stems with `support > threshold` and turn totals into means.
    /// Profiles come back sorted by stem.
    pub fn into_profiles(self, threshold: u64) -> Result<Vec<StemProfile>> {
        let total_stems = self.accumulators.len();
        let profiles: Vec<StemProfile> = self
            .accumulators
            .into_iter()
            .filter(|(_, acc)| acc.count > threshold)
            .map(|(stem, acc)| acc.into_profile(stem))
            .collect();

        info!(
            "{} distinct stems, {} above support threshold {}",
            total_stems,
            profiles.len(),
            threshold
        );

        if profiles.len() < 2 {
            bail!(
                "only {} stem(s) passed the support threshold {}; \
                 need at least 2 to cluster. Lower the threshold or check the input data.",
                profiles.len(),
                threshold
            );
        }

        Ok(profiles)
    }
}

/// Aggregate records into per-stem profiles, keeping stems with
/// `support > threshold`. Profiles come back sorted by stem.
pub fn build_profiles(
    records: &[Record],
    stemmer: &LabelStemmer,
    threshold: u64,
) -> Result<Vec<StemProfile>> {
    let mut tally = StemTally::default();
    for record in records {
        tally.absorb(stemmer, record);
    }
    tally.into_profiles(threshold)
}
