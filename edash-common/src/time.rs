//! Timestamp utilities
//!
//! Shift boundaries are stored as `YYYY-MM-DDTHH:MM:SSZ` text: lexical order
//! equals chronological order, and SQLite's `strftime` understands the format.

use chrono::{DateTime, Datelike, Months, NaiveDate, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage (second precision, `Z` suffix)
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp
pub fn parse_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Inclusive lower bound for a calendar day, in storage format
pub fn day_start(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Exclusive upper bound covering the whole calendar day
pub fn day_end_exclusive(date: NaiveDate) -> String {
    day_start(date.succ_opt().unwrap_or(NaiveDate::MAX))
}

/// `YYYY-MM` keys of the trailing `count` calendar months ending with the
/// month of `now`, oldest first.
pub fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<String> {
    let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .unwrap_or_else(|| now.date_naive());

    (0..count)
        .rev()
        .filter_map(|back| first_of_month.checked_sub_months(Months::new(back)))
        .map(|month| month.format("%Y-%m").to_string())
        .collect()
}
