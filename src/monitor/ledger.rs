// src/monitor/ledger.rs
use std::collections::HashSet;

use crate::model::IdentityKey;

/// Identities already surfaced today.
///
/// Owned by the scheduler loop; grows monotonically during a day and is only
/// cleared by [`DedupLedger::reset`] at a date boundary.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    seen: HashSet<IdentityKey>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &IdentityKey) -> bool {
        self.seen.contains(key)
    }

    /// Returns `true` when the key was not yet present.
    pub fn mark_seen(&mut self, key: IdentityKey) -> bool {
        self.seen.insert(key)
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn seed_from<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = IdentityKey>,
    {
        self.seen.extend(keys);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
