//! News monitor binary entrypoint.
//! Loads config and keywords, wires adapters and sinks, and polls until Ctrl-C.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_monitor::adapters::{http::build_client, rss::RssAdapter};
use news_monitor::config::{KeywordStore, MonitorConfig};
use news_monitor::sinks::{AlertMux, CommandVoice, CsvStorage, LogAlert, LogVoice, WebhookAlert};
use news_monitor::{Monitor, MonitorStatus, Sinks, SourceAdapter, VoiceSink};

/// Compact logs by default; `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_monitor=info,monitor=info,sink=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn install_metrics(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics_addr {addr}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}

fn build_adapters(cfg: &MonitorConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let client = build_client(cfg.fetch_timeout())?;
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(cfg.feeds.len());
    for feed in &cfg.feeds {
        match RssAdapter::from_feed(feed, client.clone()) {
            Ok(a) => adapters.push(Arc::new(a)),
            Err(e) => tracing::warn!(feed = %feed.name, error = ?e, "skipping feed"),
        }
    }
    Ok(adapters)
}

fn build_voice(cfg: &MonitorConfig) -> Arc<dyn VoiceSink> {
    match cfg.voice_command.as_deref().map(CommandVoice::from_command_line) {
        Some(Ok(v)) => Arc::new(v),
        Some(Err(e)) => {
            tracing::warn!(error = ?e, "voice command unusable, logging announcements instead");
            Arc::new(LogVoice)
        }
        None => Arc::new(LogVoice),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = MonitorConfig::load_default().context("loading monitor config")?;
    if let Some(addr) = &cfg.metrics_addr {
        install_metrics(addr)?;
    }

    let adapters = build_adapters(&cfg)?;
    if adapters.is_empty() {
        tracing::warn!("no feeds configured; cycles will find nothing");
    }

    let mut alert = AlertMux::new().with(Arc::new(LogAlert));
    if let Some(url) = &cfg.alert_webhook_url {
        alert = alert.with(Arc::new(WebhookAlert::new(url.clone())));
    }

    let sinks = Sinks {
        storage: Arc::new(CsvStorage::new(&cfg.storage_dir)),
        alert: Arc::new(alert),
        voice: build_voice(&cfg),
    };
    let terms = Arc::new(KeywordStore::new(&cfg.keywords_path));

    let monitor = Monitor::new(adapters, terms, sinks, cfg.settings())
        .with_fetch_timeout(cfg.fetch_timeout())
        .with_stop_grace(cfg.stop_grace());
    let mut status = monitor.subscribe();
    let handle = monitor.spawn();

    let status_log = tokio::spawn(async move {
        loop {
            match status.recv().await {
                Ok(MonitorStatus::Error(msg)) => tracing::warn!(status = "error", %msg),
                Ok(MonitorStatus::Stopped(reason)) => {
                    tracing::info!(status = "stopped", ?reason);
                    break;
                }
                Ok(other) => tracing::debug!(status = ?other),
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "status log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let stopper = handle.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, stopping");
            stopper.cancel();
        }
    });

    let reason = handle.join().await?;
    let _ = status_log.await;
    tracing::info!(?reason, "bye");
    Ok(())
}
