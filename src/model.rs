// src/model.rs
//! Item values produced by source adapters and the identity used to dedupe them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One hit returned by a source adapter for a search term.
///
/// Adapters build a fresh `Item` on every fetch; the monitor never mutates one
/// after it has been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Source-local numeric id, `0` when the source exposes none.
    pub id: u64,
    pub title: String,
    pub link: String,
    /// `YYYY-MM-DD HH:MM[:SS]`, source-local time.
    pub timestamp: String,
    pub search_term: String,
    /// Label of the adapter that produced the item.
    pub source: String,
}

impl Item {
    /// Dedup key for this item, or `None` when it carries neither a link nor an id.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        IdentityKey::from_parts(&self.source, self.id, &self.link)
    }
}

/// The part of an identity that is unique inside one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocalId {
    Link(String),
    Id(u64),
}

/// Identity of an item for deduplication, always scoped by source.
///
/// The link wins when present: two items with the same link from the same
/// source are the same item whatever their numeric ids say. The numeric id is
/// only used for sources that publish no link. Small sequential ids from two
/// different sources never collide because the source is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub source: String,
    pub local: LocalId,
}

impl IdentityKey {
    pub fn from_parts(source: &str, id: u64, link: &str) -> Option<Self> {
        let link = link.trim();
        let local = if !link.is_empty() {
            LocalId::Link(link.to_string())
        } else if id != 0 {
            LocalId::Id(id)
        } else {
            return None;
        };
        Some(Self {
            source: source.trim().to_string(),
            local,
        })
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local {
            LocalId::Link(link) => write!(f, "{}|{}", self.source, link),
            LocalId::Id(id) => write!(f, "{}#{}", self.source, id),
        }
    }
}
