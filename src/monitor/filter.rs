// src/monitor/filter.rs
//! Same-day recency filter.

use chrono::{NaiveDate, NaiveDateTime};

use crate::model::Item;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse an item timestamp (`YYYY-MM-DD HH:MM[:SS]`).
pub fn parse_item_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// True when the item is dated on `reference_date`.
///
/// Empty or unparseable timestamps are rejected, never assumed to be today.
pub fn accept(item: &Item, reference_date: NaiveDate) -> bool {
    parse_item_timestamp(&item.timestamp).is_some_and(|ts| ts.date() == reference_date)
}
