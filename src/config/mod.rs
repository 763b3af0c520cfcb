// src/config/mod.rs
pub mod keywords;
pub mod monitor;

pub use keywords::{KeywordSet, KeywordStore};
pub use monitor::{FeedConfig, MonitorConfig};
