// src/monitor/fanout.rs
//! Concurrent fetch of every adapter for each search term.

use anyhow::anyhow;
use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::model::Item;
use crate::monitor::filter::accept;
use crate::monitor::ledger::DedupLedger;
use crate::monitor::types::SourceAdapter;

/// One failed adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterFailure {
    pub source: String,
    pub term: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Items marked seen during this cycle, in discovery order.
    pub new_items: Vec<Item>,
    pub failures: Vec<AdapterFailure>,
    pub fetched: usize,
    pub rejected: usize,
    /// Stop was requested mid-cycle; only completed fetches were folded in.
    pub cancelled: bool,
}

type FetchResult = (String, anyhow::Result<Vec<Item>>);

pub struct FanOut {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetch_timeout: Duration,
    stop_grace: Duration,
}

impl FanOut {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            adapters,
            fetch_timeout: Duration::from_secs(20),
            stop_grace: Duration::from_millis(500),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Run all terms in order; each term's adapters run concurrently.
    ///
    /// Accepted items are marked in `ledger` before they are returned, so a
    /// slow duplicate (same identity from a later call) is dropped.
    pub async fn run_cycle(
        &self,
        terms: &[String],
        ledger: &mut DedupLedger,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        let t0 = std::time::Instant::now();
        let mut outcome = CycleOutcome::default();

        for term in terms {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let (results, cancelled) = self.fetch_term(term, cancel).await;
            fold_results(term, results, ledger, today, &mut outcome);
            if cancelled {
                outcome.cancelled = true;
                break;
            }
        }

        histogram!("monitor_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("monitor_items_fetched_total").increment(outcome.fetched as u64);
        counter!("monitor_items_rejected_total").increment(outcome.rejected as u64);
        counter!("monitor_items_new_total").increment(outcome.new_items.len() as u64);
        outcome
    }

    /// Results come back in completion order. On cancellation the calls still
    /// in flight get `stop_grace` to finish and are dropped afterwards.
    async fn fetch_term(&self, term: &str, cancel: &CancellationToken) -> (Vec<FetchResult>, bool) {
        let timeout = self.fetch_timeout;
        let mut pending: FuturesUnordered<_> = self
            .adapters
            .iter()
            .map(|adapter| async move {
                let res = match tokio::time::timeout(timeout, adapter.fetch(term)).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow!("fetch timed out after {}ms", timeout.as_millis())),
                };
                (adapter.name().to_string(), res)
            })
            .collect();

        let mut done = Vec::with_capacity(pending.len());
        let mut cancelled = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = pending.next() => match next {
                    Some(r) => done.push(r),
                    None => break,
                },
            }
        }

        if cancelled && !pending.is_empty() {
            let grace = tokio::time::sleep(self.stop_grace);
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    _ = &mut grace => break,
                    next = pending.next() => match next {
                        Some(r) => done.push(r),
                        None => break,
                    },
                }
            }
        }

        if !pending.is_empty() {
            tracing::debug!(target: "monitor", term, dropped = pending.len(), "stop grace elapsed");
        }

        (done, cancelled)
    }
}

fn fold_results(
    term: &str,
    results: Vec<FetchResult>,
    ledger: &mut DedupLedger,
    today: NaiveDate,
    outcome: &mut CycleOutcome,
) {
    for (source, res) in results {
        let items = match res {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    target: "monitor",
                    source = %source,
                    term,
                    error = ?e,
                    "adapter error"
                );
                counter!("monitor_adapter_errors_total").increment(1);
                outcome.failures.push(AdapterFailure {
                    source,
                    term: term.to_string(),
                    error: format!("{e:#}"),
                });
                continue;
            }
        };

        for mut item in items {
            outcome.fetched += 1;
            if item.source.trim().is_empty() {
                item.source = source.clone();
            }
            if item.search_term.trim().is_empty() {
                item.search_term = term.to_string();
            }
            if !accept(&item, today) {
                outcome.rejected += 1;
                continue;
            }
            let Some(key) = item.identity_key() else {
                outcome.rejected += 1;
                continue;
            };
            if ledger.mark_seen(key) {
                tracing::debug!(
                    target: "monitor",
                    source = %item.source,
                    title = %item.title,
                    "new item"
                );
                outcome.new_items.push(item);
            }
        }
    }
}
