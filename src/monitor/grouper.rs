// src/monitor/grouper.rs
//! Per-source grouping of one cycle's new items for spoken announcements.

use std::collections::HashMap;

use crate::model::Item;

/// Bucket label for items without a source.
pub const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub source: String,
    /// One entry per new item, in discovery order. Duplicates are kept.
    pub terms: Vec<String>,
}

impl SourceGroup {
    /// `[source, term, term, ...]` as handed to the voice sink.
    pub fn announcement(&self) -> Vec<String> {
        let mut seq = Vec::with_capacity(self.terms.len() + 1);
        seq.push(self.source.clone());
        seq.extend(self.terms.iter().cloned());
        seq
    }
}

/// Groups in order of each source's first appearance in the cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationBatch {
    pub groups: Vec<SourceGroup>,
}

impl NotificationBatch {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.source == source)
            .map(|g| g.terms.as_slice())
    }
}

/// Stable grouping: neither sources nor terms are re-sorted.
pub fn group(new_items: &[Item]) -> NotificationBatch {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<SourceGroup> = Vec::new();

    for item in new_items {
        let source = match item.source.trim() {
            "" => UNKNOWN_SOURCE,
            s => s,
        };
        let slot = *index.entry(source).or_insert_with(|| {
            groups.push(SourceGroup {
                source: source.to_string(),
                terms: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].terms.push(item.search_term.clone());
    }

    NotificationBatch { groups }
}
