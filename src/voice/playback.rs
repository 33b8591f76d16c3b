//! Audible feedback: cue sounds and spoken text

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::config::SoundsConfig;
use crate::process::run_command;
use crate::{Error, Result};

/// Player flags: quiet, no window, exit at end of input, read from stdin
const PLAYER_ARGS: [&str; 7] = [
    "-hide_banner",
    "-nodisp",
    "-nostats",
    "-loglevel",
    "error",
    "-autoexit",
    "-",
];

/// Canned cue sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    /// Listening started / request handled
    Ack,
    /// Didn't understand, say it again
    Question,
    /// Something went wrong, or gave up
    Error,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("ack"),
            Self::Question => f.write_str("question"),
            Self::Error => f.write_str("error"),
        }
    }
}

impl FromStr for Sound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ack" | "acknowledge" => Ok(Self::Ack),
            "question" | "clarify" => Ok(Self::Question),
            "error" => Ok(Self::Error),
            other => Err(Error::Audio(format!("unknown sound: {other}"))),
        }
    }
}

/// How an intent handler wants to be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Play a cue sound
    Sound(Sound),
    /// Say some text out loud
    Speak(String),
    /// No feedback at all
    Silent,
}

impl Reply {
    /// Deliver the reply through a feedback sink
    ///
    /// # Errors
    ///
    /// Returns error if playback or speech fails
    pub async fn deliver(&self, feedback: &dyn Feedback) -> Result<()> {
        match self {
            Self::Sound(sound) => feedback.play(*sound).await,
            Self::Speak(text) => feedback.speak(text).await,
            Self::Silent => Ok(()),
        }
    }
}

/// Sink for audible feedback
#[async_trait]
pub trait Feedback: Send + Sync {
    /// Play a cue sound to completion
    async fn play(&self, sound: Sound) -> Result<()>;

    /// Say text out loud
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Feedback through an external audio player and speech synthesizer
#[derive(Debug, Clone)]
pub struct AudioPlayback {
    config: SoundsConfig,
}

impl AudioPlayback {
    /// Create a playback sink
    #[must_use]
    pub const fn new(config: SoundsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Feedback for AudioPlayback {
    async fn play(&self, sound: Sound) -> Result<()> {
        let path = self.config.path(sound);
        tracing::debug!(%sound, path = %path.display(), "playing sound");

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Audio(format!("cannot open {}: {e}", path.display())))?;

        run_command(&self.config.player, &PLAYER_ARGS, Some(file))
            .await
            .map(drop)
            .map_err(|e| Error::Audio(e.to_string()))
    }

    async fn speak(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");

        run_command(&self.config.speech, &[text], None)
            .await
            .map(drop)
            .map_err(|e| Error::Audio(e.to_string()))
    }
}
