// tests/common/mod.rs
// Scripted adapters and recording sinks shared by the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use news_monitor::{AlertSink, IdentityKey, Item, Sinks, SourceAdapter, StorageSink, VoiceSink};

type Script = Box<dyn Fn(usize, &str) -> Result<Vec<Item>> + Send + Sync>;

/// Adapter whose answer for the n-th call (0-based) comes from a closure.
pub struct ScriptedAdapter {
    name: String,
    delay: Duration,
    script: Script,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedAdapter {
    pub fn new<F>(name: &str, script: F) -> Self
    where
        F: Fn(usize, &str) -> Result<Vec<Item>> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the same items.
    pub fn fixed(name: &str, items: Vec<Item>) -> Self {
        Self::new(name, move |_, _| Ok(items.clone()))
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, |_, _| Err(anyhow!("503 Service Unavailable")))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(_, t)| *t).collect()
    }

    pub fn call_terms(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    async fn fetch(&self, search_term: &str) -> Result<Vec<Item>> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push((search_term.to_string(), Instant::now()));
            calls.len() - 1
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)(n, search_term)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
pub struct RecordingStorage {
    pub known: HashSet<IdentityKey>,
    pub appended: Mutex<Vec<Item>>,
    pub fail_append: AtomicBool,
}

impl RecordingStorage {
    pub fn with_known<I: IntoIterator<Item = IdentityKey>>(keys: I) -> Self {
        Self {
            known: keys.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn appended_links(&self) -> Vec<String> {
        self.appended.lock().iter().map(|i| i.link.clone()).collect()
    }
}

#[async_trait]
impl StorageSink for RecordingStorage {
    async fn load_today_identities(&self, _today: NaiveDate) -> Result<HashSet<IdentityKey>> {
        Ok(self.known.clone())
    }

    async fn append_item(&self, item: &Item) -> Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.appended.lock().push(item.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlert {
    pub items: Mutex<Vec<Item>>,
    pub fail: AtomicBool,
}

impl RecordingAlert {
    pub fn count(&self) -> usize {
        self.items.lock().len()
    }

    pub fn links(&self) -> Vec<String> {
        self.items.lock().iter().map(|i| i.link.clone()).collect()
    }
}

#[async_trait]
impl AlertSink for RecordingAlert {
    async fn notify(&self, item: &Item) -> Result<()> {
        // Record first: a failing toast still counts as an attempt.
        self.items.lock().push(item.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("toast backend unavailable"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingVoice {
    pub announcements: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl VoiceSink for RecordingVoice {
    async fn announce(&self, sequence: &[String]) -> Result<()> {
        self.announcements.lock().push(sequence.to_vec());
        Ok(())
    }
}

pub struct Recorders {
    pub storage: Arc<RecordingStorage>,
    pub alert: Arc<RecordingAlert>,
    pub voice: Arc<RecordingVoice>,
}

impl Recorders {
    pub fn new() -> Self {
        Self::with_storage(RecordingStorage::default())
    }

    pub fn with_storage(storage: RecordingStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            alert: Arc::new(RecordingAlert::default()),
            voice: Arc::new(RecordingVoice::default()),
        }
    }

    pub fn sinks(&self) -> Sinks {
        Sinks {
            storage: self.storage.clone(),
            alert: self.alert.clone(),
            voice: self.voice.clone(),
        }
    }
}

pub fn item(source: &str, id: u64, link: &str, timestamp: &str) -> Item {
    Item {
        id,
        title: format!("{source} article {id}"),
        link: link.to_string(),
        timestamp: timestamp.to_string(),
        search_term: String::new(),
        source: source.to_string(),
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

pub fn key(source: &str, id: u64, link: &str) -> IdentityKey {
    IdentityKey::from_parts(source, id, link).unwrap()
}

/// `|a - b|` within `tol`.
pub fn close(a: Duration, b: Duration, tol: Duration) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff <= tol
}
