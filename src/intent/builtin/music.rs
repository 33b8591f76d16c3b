//! Music player control
//!
//! The player listens on a Unix socket and treats each received character
//! like a key press.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::intent::IntentHandler;
use crate::voice::{Reply, Slots, Sound};

/// Control characters for each spoken command
#[must_use]
pub fn control_sequence(command: &str) -> Option<&'static str> {
    match command {
        "favourite" => Some("f"),
        "skip" => Some("q"),
        "next" => Some("\n"),
        "pause" | "unpause" => Some(" "),
        "volume up" => Some("***"),
        "volume down" => Some("///"),
        _ => None,
    }
}

/// Handles the `music` intent by writing to the player's control socket
#[derive(Debug, Clone)]
pub struct MusicHandler {
    control_socket: PathBuf,
}

impl MusicHandler {
    /// Create a handler for the player listening on `control_socket`
    #[must_use]
    pub const fn new(control_socket: PathBuf) -> Self {
        Self { control_socket }
    }

    #[cfg(unix)]
    async fn write_control(&self, sequence: &str) -> anyhow::Result<()> {
        use tokio::io::AsyncWriteExt;

        let mut stream = tokio::net::UnixStream::connect(&self.control_socket)
            .await
            .with_context(|| format!("connecting to {}", self.control_socket.display()))?;
        stream.write_all(sequence.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn write_control(&self, _sequence: &str) -> anyhow::Result<()> {
        anyhow::bail!(
            "music control socket {} requires a Unix platform",
            self.control_socket.display()
        )
    }
}

#[async_trait]
impl IntentHandler for MusicHandler {
    async fn handle(&self, _text: &str, slots: &Slots) -> anyhow::Result<Option<Reply>> {
        let command = slots
            .get("command")
            .context("music intent without a command slot")?;

        let Some(sequence) = control_sequence(command) else {
            tracing::warn!(command = %command, "unimplemented music command");
            return Ok(Some(Reply::Sound(Sound::Error)));
        };

        self.write_control(sequence).await?;
        tracing::debug!(command = %command, "sent music control");
        Ok(None)
    }
}
