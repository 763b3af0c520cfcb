// src/sinks/csv_storage.rs
//! Daily CSV log of alerted items: `<dir>/report_YYYYMMDD.csv`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::model::{IdentityKey, Item};
use crate::monitor::filter::parse_item_timestamp;
use crate::monitor::types::StorageSink;

const HEADER: [&str; 7] = [
    "source",
    "id",
    "title",
    "link",
    "date",
    "search_term",
    "saved_at",
];

/// Appends one row per item. The monitor calls it from a single task, so rows
/// never interleave.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    base_dir: PathBuf,
}

impl CsvStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn file_for(&self, day: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("report_{}.csv", day.format("%Y%m%d")))
    }
}

#[async_trait::async_trait]
impl StorageSink for CsvStorage {
    async fn load_today_identities(&self, today: NaiveDate) -> Result<HashSet<IdentityKey>> {
        let path = self.file_for(today);
        tokio::task::spawn_blocking(move || read_identities(&path))
            .await
            .context("storage load task")?
    }

    async fn append_item(&self, item: &Item) -> Result<()> {
        // Items only get here when dated today, so their date names the file.
        let day = parse_item_timestamp(&item.timestamp)
            .map(|ts| ts.date())
            .unwrap_or_else(|| Local::now().date_naive());
        let path = self.file_for(day);
        let item = item.clone();
        tokio::task::spawn_blocking(move || append_row(&path, &item))
            .await
            .context("storage append task")?
    }
}

fn read_identities(path: &Path) -> Result<HashSet<IdentityKey>> {
    let mut ids = HashSet::new();
    if !path.exists() {
        return Ok(ids);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(target: "sink", error = %e, "skipping bad csv row");
                continue;
            }
        };
        if record.len() < 4 || record.get(0) == Some(HEADER[0]) {
            continue;
        }
        let source = record.get(0).unwrap_or_default();
        let id = record
            .get(1)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let link = record.get(3).unwrap_or_default();
        if let Some(key) = IdentityKey::from_parts(source, id, link) {
            ids.insert(key);
        }
    }
    Ok(ids)
}

fn append_row(path: &Path, item: &Item) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        writer.write_record(HEADER)?;
    }
    let id = item.id.to_string();
    let saved_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    writer.write_record([
        item.source.as_str(),
        id.as_str(),
        item.title.as_str(),
        item.link.as_str(),
        item.timestamp.as_str(),
        item.search_term.as_str(),
        saved_at.as_str(),
    ])?;
    writer.flush()?;
    Ok(())
}
