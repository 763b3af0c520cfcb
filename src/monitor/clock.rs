// src/monitor/clock.rs
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};

/// Local wall-clock time as seen by the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Wall clock that starts at a fixed time and advances with tokio's clock,
/// so paused-time tests (and replays) see consistent dates and hours.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    start: NaiveDateTime,
    origin: tokio::time::Instant,
}

impl SimulatedClock {
    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            start,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = ChronoDuration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| ChronoDuration::zero());
        self.start + elapsed
    }
}
