// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod adapters;
pub mod config;
pub mod model;
pub mod monitor;
pub mod sinks;

// ---- Re-exports for stable public API ----
pub use crate::model::{IdentityKey, Item};
pub use crate::monitor::scheduler::{
    Monitor, MonitorHandle, MonitorSettings, MonitorState, MonitorStatus, OperatingHours, Sinks,
    StopReason,
};
pub use crate::monitor::types::{AlertSink, SourceAdapter, StorageSink, VoiceSink};
