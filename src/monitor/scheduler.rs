// src/monitor/scheduler.rs
//! Fixed-interval polling loop: seeding, baseline, operating hours, date
//! rollover, drift-corrected waits and cancellable shutdown.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Timelike};
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::model::Item;
use crate::monitor::clock::{Clock, SystemClock};
use crate::monitor::fanout::{CycleOutcome, FanOut};
use crate::monitor::grouper::group;
use crate::monitor::ledger::DedupLedger;
use crate::monitor::terms::TermSource;
use crate::monitor::types::{AlertSink, SourceAdapter, StorageSink, VoiceSink};

const STATUS_CAPACITY: usize = 64;

/// Daily polling window `[start_hour, end_hour)`.
///
/// `start == end` is an empty window; `start > end` wraps past midnight.
/// Use [`OperatingHours::always`] for round-the-clock polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl OperatingHours {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour: start_hour.min(24),
            end_hour: end_hour.min(24),
        }
    }

    pub fn always() -> Self {
        Self::new(0, 24)
    }

    pub fn contains(&self, hour: u32) -> bool {
        let (s, e) = (self.start_hour, self.end_hour);
        if s == e {
            false
        } else if s < e {
            (s..e).contains(&hour)
        } else {
            hour >= s || hour < e
        }
    }
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self::new(7, 18)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub hours: OperatingHours,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            hours: OperatingHours::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Seeding,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    NoSearchTerms,
}

/// What the host sees of each cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStatus {
    Started,
    Seeded { known: usize },
    Baseline { marked: usize },
    Scanning,
    Updated { count: usize },
    Error(String),
    IdleOutsideHours,
    Stopped(StopReason),
}

/// Result of a single [`Monitor::poll_once`].
#[derive(Debug)]
pub enum CycleReport {
    IdleOutsideHours,
    Baseline { marked: usize },
    /// New items were already handed to the sinks.
    Completed(CycleOutcome),
    Stop(StopReason),
}

/// State carried from one cycle to the next. Owned by whoever drives
/// [`Monitor::poll_once`], normally [`Monitor::run`].
#[derive(Debug, Clone)]
pub struct CycleState {
    pub last_checked_date: NaiveDate,
    pub ledger: DedupLedger,
    pub baseline_done: bool,
    /// Last non-empty term list, reused when the term source fails to load.
    pub last_terms: Vec<String>,
}

impl CycleState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_checked_date: today,
            ledger: DedupLedger::new(),
            baseline_done: false,
            last_terms: Vec::new(),
        }
    }

    /// Clears the ledger when `today` is a new calendar day. Returns whether it did.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if today == self.last_checked_date {
            return false;
        }
        tracing::info!(
            target: "monitor",
            from = %self.last_checked_date,
            to = %today,
            cleared = self.ledger.len(),
            "date changed, resetting ledger"
        );
        self.ledger.reset();
        self.last_checked_date = today;
        true
    }
}

/// Side-effect sinks fed by the monitor.
#[derive(Clone)]
pub struct Sinks {
    pub storage: Arc<dyn StorageSink>,
    pub alert: Arc<dyn AlertSink>,
    pub voice: Arc<dyn VoiceSink>,
}

pub struct Monitor {
    fanout: FanOut,
    terms: Arc<dyn TermSource>,
    sinks: Sinks,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
    status_tx: broadcast::Sender<MonitorStatus>,
    state_tx: watch::Sender<MonitorState>,
}

impl Monitor {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        terms: Arc<dyn TermSource>,
        sinks: Sinks,
        settings: MonitorSettings,
    ) -> Self {
        crate::monitor::ensure_metrics_described();
        let (status_tx, _) = broadcast::channel(STATUS_CAPACITY);
        let (state_tx, _) = watch::channel(MonitorState::Stopped);
        Self {
            fanout: FanOut::new(adapters),
            terms,
            sinks,
            clock: Arc::new(SystemClock),
            settings,
            status_tx,
            state_tx,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fanout = self.fanout.with_fetch_timeout(timeout);
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.fanout = self.fanout.with_stop_grace(grace);
        self
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Subscribe before [`Monitor::spawn`] to see the startup statuses.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    /// Start polling on a background task.
    pub fn spawn(self) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let status_tx = self.status_tx.clone();
        let state_rx = self.state_tx.subscribe();
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        MonitorHandle {
            cancel,
            join,
            status_tx,
            state_rx,
        }
    }

    /// Seed, then poll until `cancel` fires or no search terms are left.
    pub async fn run(self, cancel: CancellationToken) -> StopReason {
        self.emit(MonitorStatus::Started);
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.finish(StopReason::Requested),
            state = self.seed() => state,
        };
        tracing::info!(
            target: "monitor",
            adapters = self.fanout.adapter_count(),
            interval_secs = self.settings.interval.as_secs(),
            start_hour = self.settings.hours.start_hour,
            end_hour = self.settings.hours.end_hour,
            "monitor started"
        );

        loop {
            if cancel.is_cancelled() {
                return self.finish(StopReason::Requested);
            }
            let started = Instant::now();

            if let CycleReport::Stop(reason) = self.poll_once(&mut state, &cancel).await {
                return self.finish(reason);
            }

            let wait = self.settings.interval.saturating_sub(started.elapsed());
            if !sleep_or_cancel(wait, &cancel).await {
                return self.finish(StopReason::Requested);
            }
        }
    }

    /// Load today's already-stored identities into a fresh ledger.
    pub async fn seed(&self) -> CycleState {
        self.set_state(MonitorState::Seeding);
        let today = self.clock.now().date();
        let mut state = CycleState::new(today);
        match self.sinks.storage.load_today_identities(today).await {
            Ok(keys) => state.ledger.seed_from(keys),
            Err(e) => {
                tracing::warn!(target: "monitor", error = ?e, "could not load today's identities");
                counter!("monitor_sink_errors_total").increment(1);
            }
        }
        tracing::info!(target: "monitor", known = state.ledger.len(), %today, "ledger seeded");
        self.emit(MonitorStatus::Seeded {
            known: state.ledger.len(),
        });
        state
    }

    /// One scheduler tick, without the inter-cycle wait.
    ///
    /// The first tick inside operating hours is the baseline: it fills the
    /// ledger but notifies nobody.
    pub async fn poll_once(
        &self,
        state: &mut CycleState,
        cancel: &CancellationToken,
    ) -> CycleReport {
        let now = self.clock.now();
        let today = now.date();
        state.roll_over(today);

        if !self.settings.hours.contains(now.hour()) {
            tracing::info!(
                target: "monitor",
                time = %now.format("%H:%M"),
                "outside operating hours"
            );
            self.emit(MonitorStatus::IdleOutsideHours);
            return CycleReport::IdleOutsideHours;
        }

        let terms = match self.load_terms(&mut state.last_terms).await {
            Some(terms) => terms,
            None => return CycleReport::Stop(StopReason::NoSearchTerms),
        };

        if !state.baseline_done {
            let outcome = self
                .fanout
                .run_cycle(&terms, &mut state.ledger, today, cancel)
                .await;
            gauge!("monitor_ledger_size").set(state.ledger.len() as f64);
            if outcome.cancelled {
                return CycleReport::Stop(StopReason::Requested);
            }
            state.baseline_done = true;
            self.set_state(MonitorState::Polling);
            let marked = outcome.new_items.len();
            tracing::info!(target: "monitor", marked, "baseline collected");
            self.emit(MonitorStatus::Baseline { marked });
            return CycleReport::Baseline { marked };
        }

        tracing::info!(
            target: "monitor",
            time = %now.format("%H:%M:%S"),
            terms = terms.len(),
            "scanning"
        );
        self.emit(MonitorStatus::Scanning);
        counter!("monitor_cycles_total").increment(1);

        let outcome = self
            .fanout
            .run_cycle(&terms, &mut state.ledger, today, cancel)
            .await;
        gauge!("monitor_ledger_size").set(state.ledger.len() as f64);

        for f in &outcome.failures {
            self.emit(MonitorStatus::Error(format!(
                "{} [{}]: {}",
                f.source, f.term, f.error
            )));
        }

        // Everything marked seen must reach the sinks, even on a cancelled cycle.
        let delivered = self.dispatch(&outcome.new_items, cancel).await;
        self.emit(MonitorStatus::Updated { count: delivered });

        if outcome.cancelled {
            return CycleReport::Stop(StopReason::Requested);
        }
        CycleReport::Completed(outcome)
    }

    /// `None` only when the source reports an empty list, or fails before any
    /// list was ever loaded. A failed reload keeps the previous terms.
    async fn load_terms(&self, last: &mut Vec<String>) -> Option<Vec<String>> {
        match self.terms.current_terms().await {
            Ok(terms) if !terms.is_empty() => {
                *last = terms.clone();
                Some(terms)
            }
            Ok(_) => {
                tracing::error!(target: "monitor", "no search terms configured");
                self.emit(MonitorStatus::Error("no search terms configured".to_string()));
                None
            }
            Err(e) if !last.is_empty() => {
                tracing::warn!(
                    target: "monitor",
                    error = ?e,
                    kept = last.len(),
                    "reloading search terms failed, keeping previous list"
                );
                self.emit(MonitorStatus::Error(format!("search terms not reloaded: {e:#}")));
                Some(last.clone())
            }
            Err(e) => {
                tracing::error!(target: "monitor", error = ?e, "loading search terms failed");
                self.emit(MonitorStatus::Error(format!("no search terms loaded: {e:#}")));
                None
            }
        }
    }

    /// Hands items to the sinks in order and returns how many were handed over.
    ///
    /// A stop request is honoured between items. Skipped items never reach
    /// storage, so the next run's seed does not know them and they alert then.
    async fn dispatch(&self, items: &[Item], cancel: &CancellationToken) -> usize {
        let mut delivered = 0;
        for item in items {
            if cancel.is_cancelled() {
                break;
            }
            delivered += 1;
            let (alerted, stored) = tokio::join!(
                self.sinks.alert.notify(item),
                self.sinks.storage.append_item(item)
            );
            if let Err(e) = alerted {
                sink_failed("alert", &e);
            }
            if let Err(e) = stored {
                sink_failed("storage", &e);
            }
        }

        if delivered < items.len() {
            tracing::warn!(
                target: "monitor",
                skipped = items.len() - delivered,
                "stop requested, remaining items not dispatched"
            );
        }

        for g in group(&items[..delivered]).groups {
            if let Err(e) = self.sinks.voice.announce(&g.announcement()).await {
                sink_failed("voice", &e);
            }
        }
        delivered
    }

    fn emit(&self, status: MonitorStatus) {
        // No subscribers is fine.
        let _ = self.status_tx.send(status);
    }

    fn set_state(&self, state: MonitorState) {
        self.state_tx.send_replace(state);
    }

    fn finish(&self, reason: StopReason) -> StopReason {
        tracing::info!(target: "monitor", ?reason, "monitor stopped");
        self.set_state(MonitorState::Stopped);
        self.emit(MonitorStatus::Stopped(reason));
        reason
    }
}

fn sink_failed(sink: &'static str, e: &anyhow::Error) {
    tracing::warn!(target: "monitor", sink, error = ?e, "sink error");
    counter!("monitor_sink_errors_total").increment(1);
}

/// `false` when cancelled before `wait` elapsed.
async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> bool {
    if wait.is_zero() {
        // Overran the interval: go again right away, but let other tasks run.
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}

/// Control surface of a running monitor.
pub struct MonitorHandle {
    cancel: CancellationToken,
    join: JoinHandle<StopReason>,
    status_tx: broadcast::Sender<MonitorStatus>,
    state_rx: watch::Receiver<MonitorState>,
}

impl MonitorHandle {
    /// Request a stop; in-flight fetches get the configured grace period.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token that stops the monitor when cancelled, for signal handlers and the like.
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> MonitorState {
        *self.state_rx.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    pub async fn join(self) -> Result<StopReason> {
        self.join
            .await
            .map_err(|e| anyhow!("monitor task failed: {e}"))
    }

    /// `stop` followed by `join`.
    pub async fn shutdown(self) -> Result<StopReason> {
        self.stop();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_are_half_open() {
        let h = OperatingHours::new(7, 18);
        assert!(!h.contains(6));
        assert!(h.contains(7));
        assert!(h.contains(17));
        assert!(!h.contains(18));
    }

    #[test]
    fn hours_wrap_midnight_and_always_on() {
        let night = OperatingHours::new(22, 6);
        assert!(night.contains(23));
        assert!(night.contains(0));
        assert!(!night.contains(12));
        assert!(OperatingHours::always().contains(0));
        assert!(OperatingHours::always().contains(23));
    }

    #[test]
    fn equal_bounds_never_open() {
        let h = OperatingHours::new(9, 9);
        assert!((0..24).all(|hour| !h.contains(hour)));
    }

    #[test]
    fn rollover_clears_only_on_new_day() {
        let d = NaiveDate::from_ymd_opt(2025, 12, 8).unwrap();
        let mut st = CycleState::new(d);
        st.ledger
            .mark_seen(crate::model::IdentityKey::from_parts("A", 1, "").unwrap());
        assert!(!st.roll_over(d));
        assert_eq!(st.ledger.len(), 1);
        assert!(st.roll_over(d.succ_opt().unwrap()));
        assert!(st.ledger.is_empty());
    }
}
