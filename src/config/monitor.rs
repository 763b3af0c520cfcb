// src/config/monitor.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::scheduler::{MonitorSettings, OperatingHours};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const ENV_START_HOUR: &str = "START_HOUR";
pub const ENV_END_HOUR: &str = "END_HOUR";

fn default_poll_interval_secs() -> u64 {
    60
}
fn default_start_hour() -> u32 {
    7
}
fn default_end_hour() -> u32 {
    18
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_stop_grace_ms() -> u64 {
    500
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_keywords_path() -> PathBuf {
    PathBuf::from("config/keywords.json")
}

/// One RSS source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    /// Query parameter that carries the search term (search-style feeds).
    /// Without it the whole feed is fetched and filtered locally.
    #[serde(default)]
    pub term_param: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_keywords_path")]
    pub keywords_path: PathBuf,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub alert_webhook_url: Option<String>,
    /// Program + leading args; each phrase is appended as the last argument.
    #[serde(default)]
    pub voice_command: Option<Vec<String>>,
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            stop_grace_ms: default_stop_grace_ms(),
            storage_dir: default_storage_dir(),
            keywords_path: default_keywords_path(),
            feeds: Vec::new(),
            alert_webhook_url: None,
            voice_command: None,
            metrics_addr: None,
        }
    }
}

impl MonitorConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing monitor config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/monitor.toml");
            let json_p = PathBuf::from("config/monitor.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>(ENV_POLL_INTERVAL_SECS) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_parse::<u32>(ENV_START_HOUR) {
            self.start_hour = v;
        }
        if let Some(v) = env_parse::<u32>(ENV_END_HOUR) {
            self.end_hour = v;
        }
    }

    fn sanitize(&mut self) {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.start_hour = self.start_hour.min(24);
        self.end_hour = self.end_hour.min(24);
        self.fetch_timeout_secs = self.fetch_timeout_secs.max(1);
        self.feeds.retain(|f| !f.name.trim().is_empty() && !f.url.trim().is_empty());
        if let Some(cmd) = &self.voice_command {
            if cmd.iter().all(|p| p.trim().is_empty()) {
                self.voice_command = None;
            }
        }
    }

    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            hours: OperatingHours::new(self.start_hour, self.end_hour),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    // JSON first only when hinted or content looks like an object.
    let try_json_first = hint_ext == "json" || s.trim_start().starts_with('{');
    if try_json_first {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    match toml::from_str::<MonitorConfig>(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => {
            if !try_json_first {
                if let Ok(v) = serde_json::from_str(s) {
                    return Ok(v);
                }
            }
            Err(anyhow!("unsupported monitor config format: {toml_err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fills_defaults() {
        let cfg = parse_config(
            r#"
poll_interval_secs = 30

[[feeds]]
name = "MK"
url = "https://www.mk.co.kr/rss/30000001/"
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.start_hour, 7);
        assert_eq!(cfg.end_hour, 18);
        assert_eq!(cfg.feeds.len(), 1);
        assert_eq!(cfg.feeds[0].term_param, None);
    }

    #[test]
    fn json_is_detected_without_hint() {
        let cfg = parse_config(r#"{"start_hour": 0, "end_hour": 24}"#, "").unwrap();
        assert_eq!(cfg.settings().hours, OperatingHours::always());
    }

    #[test]
    fn sanitize_clamps() {
        let mut cfg = MonitorConfig {
            poll_interval_secs: 0,
            start_hour: 30,
            voice_command: Some(vec![" ".into()]),
            ..Default::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.poll_interval_secs, 1);
        assert_eq!(cfg.start_hour, 24);
        assert!(cfg.voice_command.is_none());
    }
}
