// src/monitor/types.rs
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::model::{IdentityKey, Item};

/// A searchable external source (news site, RSS feed, ...).
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, search_term: &str) -> Result<Vec<Item>>;
    /// Label used as `Item::source` and in logs.
    fn name(&self) -> &str;
}

/// Durable record of what was alerted today.
#[async_trait::async_trait]
pub trait StorageSink: Send + Sync {
    /// Identities already recorded for `today`; called once before the first cycle.
    async fn load_today_identities(&self, today: NaiveDate) -> Result<HashSet<IdentityKey>>;
    async fn append_item(&self, item: &Item) -> Result<()>;
}

/// User-facing notification, one call per new item.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, item: &Item) -> Result<()>;
}

/// Spoken announcement: `[source label, term, term, ...]`.
#[async_trait::async_trait]
pub trait VoiceSink: Send + Sync {
    async fn announce(&self, sequence: &[String]) -> Result<()>;
}
