// src/sinks/mod.rs
//! Reference alert, storage and voice sinks.

pub mod csv_storage;
pub mod voice;
pub mod webhook;

use anyhow::Result;
use std::sync::Arc;

use crate::model::Item;
use crate::monitor::types::AlertSink;

pub use csv_storage::CsvStorage;
pub use voice::{CommandVoice, LogVoice};
pub use webhook::WebhookAlert;

/// Logs each new item.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlert;

#[async_trait::async_trait]
impl AlertSink for LogAlert {
    async fn notify(&self, item: &Item) -> Result<()> {
        tracing::info!(
            target: "sink",
            source = %item.source,
            term = %item.search_term,
            link = %item.link,
            "{}",
            item.title
        );
        Ok(())
    }
}

/// Fans one alert out to every channel. All channels are tried; the first
/// error is returned afterwards.
#[derive(Clone, Default)]
pub struct AlertMux {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait::async_trait]
impl AlertSink for AlertMux {
    async fn notify(&self, item: &Item) -> Result<()> {
        let mut first_err = None;
        for s in &self.sinks {
            if let Err(e) = s.notify(item).await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
