//! Shared helpers for certificate rendering.

use chrono::{Datelike, Days, Local, NaiveDate};

/// Days added to `fecha_certificado` before display. Kept for compatibility
/// with already printed certificates.
// TODO: drop the offset once stored dates are audited against printed ones.
pub const ISSUE_DATE_DISPLAY_OFFSET_DAYS: u64 = 1;

fn display_issue_date(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(ISSUE_DATE_DISPLAY_OFFSET_DAYS))
        .unwrap_or(date)
}

/// `dd-mm-yyyy`, as printed on the document. Empty when no date is stored.
pub fn format_issue_date(date: Option<NaiveDate>) -> String {
    date.map(|d| format_padded(display_issue_date(d)))
        .unwrap_or_default()
}

/// `d/m/yyyy`, as shown on the summary card.
pub fn format_issue_date_short(date: Option<NaiveDate>) -> String {
    date.map(display_issue_date)
        .map(|d| format!("{}/{}/{}", d.day(), d.month(), d.year()))
        .unwrap_or_default()
}

pub fn format_today() -> String {
    format_padded(Local::now().date_naive())
}

pub fn format_padded(date: NaiveDate) -> String {
    format!("{:02}-{:02}-{}", date.day(), date.month(), date.year())
}

/// Escape special characters for Typst strings.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\n', r"\n")
}

/// Quoted Typst string literal.
pub fn typst_str(value: &str) -> String {
    format!("\"{}\"", escape_typst_string(value))
}

/// Sanitize a string for use in filenames.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_dash = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !last_dash && !result.is_empty()
        {
            result.push('-');
            last_dash = true;
        }
    }

    let trimmed = result.trim_matches('-');
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    trimmed.to_string()
}

/// Typst lengths are in points; layouts are specified in CSS pixels.
pub fn px_to_pt(px: u32) -> f64 {
    px as f64 * 0.75
}
