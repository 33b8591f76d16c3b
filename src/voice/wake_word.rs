//! Wake word detection
//!
//! Blocks until the speech tool hears the wake word once.

use async_trait::async_trait;

use crate::process::run_command;
use crate::{Error, Result};

/// Waits for the user's attention
#[async_trait]
pub trait WakeDetector: Send + Sync {
    /// Return once a wake signal is detected
    ///
    /// # Errors
    ///
    /// Returns error if detection fails
    async fn wait_for_wake(&self) -> Result<()>;
}

/// Wake detection through the speech tool's `wait-wake` command
#[derive(Debug, Clone)]
pub struct CommandWakeDetector {
    command: String,
}

impl CommandWakeDetector {
    /// Create a detector that runs `<command> wait-wake --exit-count 1`
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl WakeDetector for CommandWakeDetector {
    async fn wait_for_wake(&self) -> Result<()> {
        // TODO: keep one wait-wake process running and discard stale wakes
        // before each wait, instead of paying startup latency per cycle
        let stdout = run_command(&self.command, &["wait-wake", "--exit-count", "1"], None)
            .await
            .map_err(|e| Error::WakeWord(e.to_string()))?;

        tracing::debug!(output = %stdout.trim(), "got output from wait-wake");
        Ok(())
    }
}
