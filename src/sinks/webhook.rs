// src/sinks/webhook.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::model::Item;
use crate::monitor::types::AlertSink;

const MAX_RETRIES: u8 = 8;

/// Posts one message per item to a Slack- or Discord-style webhook.
#[derive(Clone)]
pub struct WebhookAlert {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookAlert {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Attempts per item, clamped to `1..=8`.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_RETRIES);
        self
    }
}

#[derive(Serialize)]
struct WebhookPayload {
    /// Slack
    text: String,
    /// Discord
    content: String,
}

impl WebhookPayload {
    fn for_item(item: &Item) -> Self {
        let text = format!(
            "[{}] {}\n{}\n({} · {})",
            item.source, item.title, item.link, item.search_term, item.timestamp
        );
        Self {
            content: text.clone(),
            text,
        }
    }
}

#[async_trait::async_trait]
impl AlertSink for WebhookAlert {
    async fn notify(&self, item: &Item) -> Result<()> {
        let payload = WebhookPayload::for_item(item);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("webhook request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "sink", attempt, error = %err, "webhook retry");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

/// 500ms, 1s, 2s, ... capped at 32s.
fn backoff(attempt: u8) -> Duration {
    let shift = u32::from(attempt.saturating_sub(1)).min(6);
    Duration::from_millis(500u64 << shift)
}
