// src/adapters/mod.rs
//! Reference source adapters and the helpers they share by composition.

pub mod dates;
pub mod http;
pub mod rss;

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize a title or snippet: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Trailing number of a link (`.../view/123456` or `?newsid=123456`), 0 when none.
pub fn id_from_link(link: &str) -> u64 {
    static RE_ID: OnceCell<Regex> = OnceCell::new();
    let re = RE_ID.get_or_init(|| Regex::new(r"(\d+)\D*$").unwrap());
    re.captures(link)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Case-insensitive substring match used by feeds that cannot search server-side.
pub fn matches_term(term: &str, fields: &[&str]) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}
