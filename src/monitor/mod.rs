// src/monitor/mod.rs
//! Polling core: scheduler, fan-out, same-day filter, dedup ledger and grouping.

pub mod clock;
pub mod fanout;
pub mod filter;
pub mod grouper;
pub mod ledger;
pub mod scheduler;
pub mod terms;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_cycles_total", "Polling cycles that ran a fan-out.");
        describe_counter!(
            "monitor_items_fetched_total",
            "Items returned by adapters before filtering."
        );
        describe_counter!(
            "monitor_items_new_total",
            "Items newly marked seen (alerted or baselined)."
        );
        describe_counter!(
            "monitor_items_rejected_total",
            "Items dropped as not dated today or without identity."
        );
        describe_counter!(
            "monitor_adapter_errors_total",
            "Adapter fetch failures, timeouts included."
        );
        describe_counter!("monitor_sink_errors_total", "Alert/storage/voice sink failures.");
        describe_gauge!("monitor_ledger_size", "Identities in today's dedup ledger.");
        describe_histogram!("monitor_cycle_ms", "Fan-out duration in milliseconds.");
    });
}
