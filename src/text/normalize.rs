// Label normalization — free-text event types to clean word tokens.

/// Normalize a raw event-type label into lowercase word tokens.
///
/// Every ASCII digit and every ASCII punctuation character becomes a
/// space, the result is split on whitespace, and tokens are lowercased.
/// "Heavy Rain/Small Stream Flood" → ["heavy", "rain", "small",
/// "stream", "flood"]. A label with no alphabetic content yields an
/// empty vector; such a record contributes nothing downstream.
pub fn normalize_label(label: &str) -> Vec<String> {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_digit() || c.is_ascii_punctuation() {
                ' '
            } else {
                c
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}
