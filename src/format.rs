//! Display Formatting
//!
//! Pure functions turning raw counts, ratios and timestamps into the
//! strings shown on cards, tables, chart tooltips and chat bubbles.

use chrono::{DateTime, FixedOffset, Utc};

/// One crore (10,000,000)
const CRORE: u64 = 10_000_000;
/// One lakh (100,000)
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;

/// IST offset in seconds (+05:30)
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Format an integer with comma thousands separators: `1234567` -> `"1,234,567"`.
pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

/// Format a count using Indian units.
///
/// `>= 1 crore` renders as `Cr`, `>= 1 lakh` as `L`, `>= 1000` as `K`, each
/// with two decimals. Smaller values are printed literally.
pub fn format_large_number(num: u64) -> String {
    if num >= CRORE {
        format!("{:.2}Cr", num as f64 / CRORE as f64)
    } else if num >= LAKH {
        format!("{:.2}L", num as f64 / LAKH as f64)
    } else if num >= THOUSAND {
        format!("{:.2}K", num as f64 / THOUSAND as f64)
    } else {
        num.to_string()
    }
}

/// Format a ratio with an `x` suffix. Missing ratios render as `0x`.
pub fn format_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}x", r),
        None => "0x".to_string(),
    }
}

/// Format a z-score in standard deviations: `3.456` -> `"3.46σ"`.
/// Unscored districts render as `-`.
pub fn format_z_score(z: Option<f64>) -> String {
    match z {
        Some(z) => format!("{:.2}σ", z),
        None => "-".to_string(),
    }
}

/// Truncate to `max_len` characters, appending `...` when anything was cut.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len).collect();
    out.push_str("...");
    out
}

/// Render a timestamp in India Standard Time, e.g. `16 Oct 2026, 3:45 pm`.
pub fn display_timestamp(ts: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => ts
            .with_timezone(&ist)
            .format("%-d %b %Y, %-I:%M %P")
            .to_string(),
        None => ts.format("%-d %b %Y, %H:%M UTC").to_string(),
    }
}
