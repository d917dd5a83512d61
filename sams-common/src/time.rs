//! Timestamp utilities

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Today's date (UTC)
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Calendar day of an ISO-8601 timestamp
///
/// The day is the first 10 characters (`YYYY-MM-DD`) exactly as written, so a
/// timestamp carrying a local offset keeps its local date.
pub fn calendar_date(timestamp: &str) -> Option<NaiveDate> {
    let day = timestamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Wall-clock time of day of an ISO-8601 timestamp, as written (minute precision)
pub fn time_of_day(timestamp: &str) -> Option<NaiveTime> {
    let hm = timestamp.get(11..16)?;
    parse_hh_mm(hm)
}

/// Parse a `HH:MM` wall-clock time
pub fn parse_hh_mm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Format a time as `HH:MM`
pub fn format_hh_mm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Check that a string is a valid ISO-8601 / RFC 3339 timestamp
pub fn is_valid_timestamp(timestamp: &str) -> bool {
    DateTime::parse_from_rfc3339(timestamp).is_ok()
        || chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}
