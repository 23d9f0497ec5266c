//! Date/time utilities for Agora.
//!
//! Timestamps are stored in the database as UTC text in SQLite's
//! `YYYY-MM-DD HH:MM:SS` format, so lexical and chronological order agree.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeDelta, Utc};

use crate::{AgoraError, Result};

/// Format used for timestamps stored in the database.
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC datetime the way the database stores it.
pub fn to_sql_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(SQL_DATETIME_FORMAT).to_string()
}

/// Current time in database format.
pub fn now_sql() -> String {
    to_sql_datetime(&Utc::now())
}

/// Database timestamp `seconds` from now (negative values go back in time).
///
/// Offsets that leave chrono's range, or push the year past 9999, are a
/// validation error.
pub fn sql_datetime_after_secs(seconds: i64) -> Result<String> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .filter(|dt| (0..=9999).contains(&dt.year()))
        .map(|dt| to_sql_datetime(&dt))
        .ok_or_else(|| AgoraError::Validation(format!("time offset of {seconds}s is out of range")))
}

/// Parse a database timestamp.
///
/// Accepts both the SQLite format and RFC 3339.
pub fn parse_sql_datetime(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(datetime_str, SQL_DATETIME_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(datetime_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a database datetime string (YYYY-MM-DD HH:MM:SS) to RFC3339 format.
///
/// Values that are already RFC3339 are returned unchanged.
pub fn to_rfc3339(datetime_str: &str) -> String {
    if datetime_str.contains('T') {
        return datetime_str.to_string();
    }
    format!("{}Z", datetime_str.replace(' ', "T"))
}

/// Convert an optional database datetime string to RFC3339.
pub fn to_rfc3339_opt(datetime_str: Option<&str>) -> Option<String> {
    datetime_str.map(to_rfc3339)
}
