// Porter-family stemming for event-type tokens.
//
// "WIND", "WINDS", and "Winds" should all land on the stem "wind" so a
// concept's damage profile accumulates in one place. The Snowball English
// stemmer does the morphology; this wrapper adds the per-record dedup the
// aggregation stage relies on.

use std::collections::BTreeSet;

use rust_stemmers::{Algorithm, Stemmer};

use super::normalize::normalize_label;

/// Stems event-type tokens with the Snowball English (Porter2) algorithm.
///
/// Stemming is a total function: any token in produces a stem out, with
/// unrecognized words passed through unchanged.
pub struct LabelStemmer {
    stemmer: Stemmer,
}

impl LabelStemmer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Reduce a single lowercase token to its stem ("winds" → "wind").
    pub fn stem(&self, token: &str) -> String {
        self.stemmer.stem(token).into_owned()
    }

    /// Normalize a raw label and stem every token, deduplicating stems.
    ///
    /// The same stem appearing twice in one label counts once per record.
    /// A BTreeSet keeps iteration order deterministic for everything
    /// downstream.
    pub fn stem_label(&self, label: &str) -> BTreeSet<String> {
        normalize_label(label)
            .iter()
            .map(|token| self.stem(token))
            .collect()
    }
}

impl Default for LabelStemmer {
    fn default() -> Self {
        Self::new()
    }
}
