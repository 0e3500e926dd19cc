// Utility helpers for parsing and presenting amounts.
//
// Spreadsheet cells arrive as loosely typed text or floats; everything that
// turns them into numbers, or numbers back into display strings, lives here.
use num_format::{CustomFormat, Grouping, ToFormattedString};
use once_cell::sync::Lazy;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

// Last three digits form one group, the rest go in pairs: 12,34,567.
static INDIAN: Lazy<CustomFormat> = Lazy::new(|| {
    CustomFormat::builder()
        .grouping(Grouping::Indian)
        .separator(",")
        .minus_sign("-")
        .build()
        .unwrap_or_default()
});

/// Whole-number amount with South Asian digit grouping. The fraction is
/// truncated, matching how the figures are shown in the finance sheets.
pub fn format_indian(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    let whole = n.trunc() as i64;
    whole.to_formatted_string(&*INDIAN)
}

/// Two-decimal percentage string, `12.34%`.
pub fn format_percent(p: f64) -> String {
    if !p.is_finite() {
        return "0.00%".to_string();
    }
    // avoid "-0.00%"
    let p = if p.abs() < 0.005 { 0.0 } else { p };
    format!("{:.2}%", p)
}

/// Chart label in lakhs (1L = 100,000); zero gets no label.
pub fn lakh_label(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return String::new();
    }
    format!("{:.2}L", v / 1e5)
}

/// `numerator / denominator * 100`, zero when the denominator is zero.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let pct = numerator * 100.0 / denominator;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}
