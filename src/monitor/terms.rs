// src/monitor/terms.rs
//! Where the scheduler gets its search terms each cycle.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

#[async_trait::async_trait]
pub trait TermSource: Send + Sync {
    /// Terms for the next cycle, in search order.
    async fn current_terms(&self) -> Result<Vec<String>>;
}

/// Trim, drop empties and duplicates; first occurrence keeps its position.
pub fn clean_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for t in terms {
        let t = t.as_ref().trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

/// Fixed list, mostly for tests and one-off runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTerms(Vec<String>);

impl StaticTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(clean_terms(terms))
    }
}

#[async_trait::async_trait]
impl TermSource for StaticTerms {
    async fn current_terms(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// In-memory list a host can edit while the monitor runs.
#[derive(Debug, Clone, Default)]
pub struct SharedTerms {
    inner: Arc<RwLock<Vec<String>>>,
}

impl SharedTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            inner: Arc::new(RwLock::new(clean_terms(terms))),
        }
    }

    pub fn set<I, S>(&self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned = clean_terms(terms);
        match self.inner.write() {
            Ok(mut guard) => *guard = cleaned,
            Err(poisoned) => *poisoned.into_inner() = cleaned,
        }
    }
}

#[async_trait::async_trait]
impl TermSource for SharedTerms {
    async fn current_terms(&self) -> Result<Vec<String>> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }
}
