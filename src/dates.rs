use crate::data::Cell;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used for category values that do not parse as a calendar date
pub const INVALID_DATE: &str = "Invalid date";

/// Calendar precision of a date-grouped category label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateGranularity {
    Day,
    #[default]
    Month,
    Year,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Attempt a calendar-date parse of a cell.
///
/// Four-digit integers (1000 to 9999) are calendar years; other numbers are
/// milliseconds since the Unix epoch (UTC). Empty cells never parse.
pub fn parse_date(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) if is_year(*n) => year_start(*n as i32),
        Cell::Number(ms) => parse_epoch_millis(*ms),
        Cell::Text(text) => parse_date_text(text),
    }
}

fn is_year(n: f64) -> bool {
    n.fract() == 0.0 && (1000.0..=9999.0).contains(&n)
}

fn year_start(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)
}

fn parse_epoch_millis(ms: f64) -> Option<NaiveDateTime> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ms.trunc() as i64).map(|dt| dt.naive_utc())
}

/// Parse a textual date in any of the accepted layouts
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // Partial dates: "YYYY-MM" and a bare four-digit year
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        return year_start(text.parse().ok()?);
    }

    None
}

/// Render a date at the requested precision (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`)
pub fn format_date(date: &NaiveDateTime, granularity: DateGranularity) -> String {
    match granularity {
        DateGranularity::Year => format!("{}", date.year()),
        DateGranularity::Month => format!("{}-{:02}", date.year(), date.month()),
        DateGranularity::Day => format!("{}-{:02}-{:02}", date.year(), date.month(), date.day()),
    }
}

/// Date label for a category cell, or [`INVALID_DATE`]
pub fn date_label(cell: &Cell, granularity: DateGranularity) -> String {
    match parse_date(cell) {
        Some(date) => format_date(&date, granularity),
        None => INVALID_DATE.to_string(),
    }
}
