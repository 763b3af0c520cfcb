// src/adapters/dates.rs
//! Turn the date strings sources publish into `YYYY-MM-DD HH:MM:SS`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

pub const ITEM_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];

/// Parse a source date string; `now` supplies the date for time-only values
/// (`14:30`), which sources use for items published today.
///
/// Date-only values map to midnight. RFC 2822 / RFC 3339 values are converted
/// to local time. Anything else yields `None`.
pub fn parse_source_datetime(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt);
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return d.and_hms_opt(0, 0, 0);
    }
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
        .map(|t| now.date().and_time(t))
}

/// [`parse_source_datetime`] rendered in the item timestamp format.
pub fn normalize_timestamp(raw: &str, now: NaiveDateTime) -> Option<String> {
    parse_source_datetime(raw, now).map(|dt| dt.format(ITEM_TIMESTAMP_FORMAT).to_string())
}
