// src/sinks/voice.rs
use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::monitor::types::VoiceSink;

/// Speaks each phrase with an external TTS program (`espeak`, `say`, ...),
/// the phrase being appended as the last argument.
///
/// Announcements are queued to one player task and spoken in order, so a slow
/// speech engine never holds up polling.
#[derive(Debug, Clone)]
pub struct CommandVoice {
    program: String,
    args: Vec<String>,
    queue: Arc<OnceCell<mpsc::UnboundedSender<Vec<String>>>>,
}

impl CommandVoice {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            queue: Arc::new(OnceCell::new()),
        }
    }

    /// `["espeak", "-v", "ko"]` style command line.
    pub fn from_command_line(parts: &[String]) -> Result<Self> {
        let mut it = parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty());
        let program = it.next().ok_or_else(|| anyhow!("empty voice command"))?;
        Ok(Self::new(program, it.map(str::to_string).collect()))
    }

    // Started on first use so construction works outside a runtime.
    fn player(&self) -> &mpsc::UnboundedSender<Vec<String>> {
        self.queue.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(play_queue(self.program.clone(), self.args.clone(), rx));
            tx
        })
    }
}

async fn play_queue(
    program: String,
    args: Vec<String>,
    mut rx: mpsc::UnboundedReceiver<Vec<String>>,
) {
    while let Some(phrases) = rx.recv().await {
        for phrase in phrases {
            let status = Command::new(&program)
                .args(&args)
                .arg(&phrase)
                .kill_on_drop(true)
                .status()
                .await;
            match status {
                Ok(s) if s.success() => {}
                Ok(s) => {
                    tracing::warn!(
                        target: "sink",
                        %program,
                        code = ?s.code(),
                        "voice command failed"
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        target: "sink",
                        %program,
                        error = %e,
                        "voice command did not start"
                    );
                    break;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl VoiceSink for CommandVoice {
    async fn announce(&self, sequence: &[String]) -> Result<()> {
        if sequence.is_empty() {
            return Ok(());
        }
        self.player()
            .send(sequence.to_vec())
            .map_err(|_| anyhow!("voice player stopped"))
    }
}

/// Logs announcements instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogVoice;

#[async_trait::async_trait]
impl VoiceSink for LogVoice {
    async fn announce(&self, sequence: &[String]) -> Result<()> {
        tracing::info!(target: "sink", announcement = %sequence.join(", "), "voice");
        Ok(())
    }
}
