// tests/fanout.rs
mod common;

use chrono::NaiveDate;
use news_monitor::monitor::fanout::FanOut;
use news_monitor::monitor::ledger::DedupLedger;
use news_monitor::SourceAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{item, ScriptedAdapter};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 8).unwrap()
}

fn terms(ts: &[&str]) -> Vec<String> {
    ts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn failing_adapter_does_not_abort_siblings() {
    let bad = Arc::new(ScriptedAdapter::failing("Broken"));
    let good = Arc::new(ScriptedAdapter::fixed(
        "Yonhap",
        vec![item("Yonhap", 11, "https://y.test/11", "2025-12-08 10:00")],
    ));
    let fan = FanOut::new(vec![
        bad.clone() as Arc<dyn SourceAdapter>,
        good.clone() as Arc<dyn SourceAdapter>,
    ]);

    let mut ledger = DedupLedger::new();
    let out = fan
        .run_cycle(&terms(&["X", "Y"]), &mut ledger, today(), &CancellationToken::new())
        .await;

    assert_eq!(bad.call_count(), 2);
    assert_eq!(good.call_count(), 2);
    assert_eq!(out.new_items.len(), 1, "same link on the second term is not new");
    assert_eq!(out.new_items[0].search_term, "X");
    assert_eq!(out.failures.len(), 2);
    assert!(out.failures.iter().all(|f| f.source == "Broken"));
    assert_eq!(out.failures[1].term, "Y");
    assert!(!out.cancelled);
}

#[tokio::test(start_paused = true)]
async fn same_small_id_from_two_sources_are_distinct_in_completion_order() {
    // B answers first even though it is configured second.
    let a = Arc::new(
        ScriptedAdapter::fixed("A", vec![item("A", 5, "u5", "2025-12-08 09:00")])
            .with_delay(Duration::from_millis(200)),
    );
    let b = Arc::new(
        ScriptedAdapter::fixed("B", vec![item("B", 5, "u5b", "2025-12-08 09:01")])
            .with_delay(Duration::from_millis(100)),
    );
    let fan = FanOut::new(vec![a as Arc<dyn SourceAdapter>, b as Arc<dyn SourceAdapter>]);

    let mut ledger = DedupLedger::new();
    let out = fan
        .run_cycle(&terms(&["X"]), &mut ledger, today(), &CancellationToken::new())
        .await;

    let links: Vec<_> = out.new_items.iter().map(|i| i.link.as_str()).collect();
    assert_eq!(links, vec!["u5b", "u5"]);
    assert_eq!(ledger.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn adapters_for_one_term_run_concurrently() {
    let slow = |name: &str| {
        Arc::new(ScriptedAdapter::fixed(name, vec![]).with_delay(Duration::from_secs(3)))
            as Arc<dyn SourceAdapter>
    };
    let fan = FanOut::new(vec![slow("A"), slow("B"), slow("C")]);

    let started = tokio::time::Instant::now();
    let mut ledger = DedupLedger::new();
    fan.run_cycle(&terms(&["X"]), &mut ledger, today(), &CancellationToken::new())
        .await;
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_failure_for_that_adapter_only() {
    let hung =
        Arc::new(ScriptedAdapter::fixed("Hung", vec![]).with_delay(Duration::from_secs(3600)));
    let ok = Arc::new(ScriptedAdapter::fixed(
        "Ok",
        vec![item("Ok", 1, "ok/1", "2025-12-08 08:00")],
    ));
    let fan = FanOut::new(vec![hung as Arc<dyn SourceAdapter>, ok as Arc<dyn SourceAdapter>])
        .with_fetch_timeout(Duration::from_secs(20));

    let mut ledger = DedupLedger::new();
    let out = fan
        .run_cycle(&terms(&["X"]), &mut ledger, today(), &CancellationToken::new())
        .await;

    assert_eq!(out.new_items.len(), 1);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].source, "Hung");
    assert!(out.failures[0].error.contains("timed out"));
}

#[tokio::test]
async fn filters_other_days_and_seen_identities() {
    let a = Arc::new(ScriptedAdapter::fixed(
        "A",
        vec![
            item("A", 1, "a/1", "2025-12-08 09:00"),
            item("A", 2, "a/2", "2025-12-07 09:00"),
            item("A", 3, "a/3", ""),
            item("A", 4, "a/4", "2025-12-08 09:30"),
        ],
    ));
    let fan = FanOut::new(vec![a as Arc<dyn SourceAdapter>]);

    let mut ledger = DedupLedger::new();
    ledger.mark_seen(common::key("A", 4, "a/4"));
    let out = fan
        .run_cycle(&terms(&["X"]), &mut ledger, today(), &CancellationToken::new())
        .await;

    assert_eq!(out.new_items.len(), 1);
    assert_eq!(out.new_items[0].link, "a/1");
    assert_eq!(out.rejected, 2);
    assert_eq!(out.fetched, 4);
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_completed_fetches_and_drops_in_flight() {
    let fast = Arc::new(ScriptedAdapter::fixed(
        "Fast",
        vec![item("Fast", 1, "f/1", "2025-12-08 09:00")],
    ));
    let slow = Arc::new(
        ScriptedAdapter::fixed("Slow", vec![item("Slow", 2, "s/2", "2025-12-08 09:00")])
            .with_delay(Duration::from_secs(60)),
    );
    let fan = FanOut::new(vec![
        fast as Arc<dyn SourceAdapter>,
        slow.clone() as Arc<dyn SourceAdapter>,
    ])
    .with_fetch_timeout(Duration::from_secs(120))
    .with_stop_grace(Duration::from_millis(500));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let mut ledger = DedupLedger::new();
    let out = fan
        .run_cycle(&terms(&["X", "Y"]), &mut ledger, today(), &cancel)
        .await;

    assert!(out.cancelled);
    assert!(started.elapsed() <= Duration::from_millis(1600));
    assert_eq!(out.new_items.len(), 1);
    assert_eq!(out.new_items[0].link, "f/1");
    assert_eq!(ledger.len(), 1);
    // The second term never started.
    assert_eq!(slow.call_terms(), vec!["X"]);
}
