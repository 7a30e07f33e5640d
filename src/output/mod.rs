// Output formatting — terminal display, markdown report, JSON export.

pub mod export;
pub mod markdown;
pub mod terminal;

/// Format a dollar amount with thousands separators and cents.
///
/// Damage means range from under a dollar to hundreds of thousands, so the
/// grouping is what keeps the tables readable.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let whole = (cents / 100).unsigned_abs().to_string();
    let frac = (cents % 100).unsigned_abs();
    format!("{sign}${}.{frac:02}", group_thousands(&whole))
}

/// Format a plain count with thousands separators.
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
