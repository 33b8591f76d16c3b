//! Daemon - the wake/listen/dispatch loop
//!
//! Interactions run strictly one at a time so overlapping events can never
//! confuse the person talking to it. Only the listener inside an interaction
//! runs concurrently.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ListenConfig;
use crate::intent::IntentRegistry;
use crate::voice::{
    AudioPlayback, CommandWakeDetector, Feedback, Listener, RecognitionResult, Reply, Sound,
    SpeechPipeline, WakeDetector,
};
use crate::{Config, Result};

/// Pause after a failed interaction before waiting for the next wake
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// How one interaction ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An intent was recognized and dispatched
    Dispatched(Reply),
    /// Nothing was said before the timeout; assumed to be a false wake
    TimedOut,
    /// Every attempt was heard but none had a recognizable intent
    Exhausted,
}

/// The voiced daemon - orchestrates wake, listen and dispatch
pub struct Daemon {
    listen: ListenConfig,
    wake: Arc<dyn WakeDetector>,
    listener: Arc<dyn Listener>,
    feedback: Arc<dyn Feedback>,
    intents: Arc<IntentRegistry>,
}

impl Daemon {
    /// Create a daemon driving the configured external tools
    #[must_use]
    pub fn new(config: &Config, intents: IntentRegistry) -> Self {
        Self::with_parts(
            config.listen.clone(),
            Arc::new(CommandWakeDetector::new(config.listen.command.clone())),
            Arc::new(SpeechPipeline::new(config.listen.clone())),
            Arc::new(AudioPlayback::new(config.sounds.clone())),
            intents,
        )
    }

    /// Create a daemon from its collaborators
    #[must_use]
    pub fn with_parts(
        listen: ListenConfig,
        wake: Arc<dyn WakeDetector>,
        listener: Arc<dyn Listener>,
        feedback: Arc<dyn Feedback>,
        intents: IntentRegistry,
    ) -> Self {
        Self {
            listen,
            wake,
            listener,
            feedback,
            intents: Arc::new(intents),
        }
    }

    /// Run interactions until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the interrupt handler cannot be installed
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            intents = self.intents.len(),
            timeout = ?self.listen.timeout,
            max_attempts = self.listen.max_attempts,
            "daemon running"
        );

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    tracing::info!("shutdown requested");
                    break;
                }
                outcome = self.run_cycle() => {
                    if outcome.is_none() {
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run one interaction, absorbing any failure
    ///
    /// Failures are logged and answered with the error cue. Returns `None`
    /// if the interaction failed.
    pub async fn run_cycle(&self) -> Option<CycleOutcome> {
        match self.attempt_interaction().await {
            Ok(outcome) => {
                tracing::debug!(?outcome, "interaction finished");
                Some(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "error in listen loop");
                if let Err(e) = self.feedback.play(Sound::Error).await {
                    tracing::error!(error = %e, "failed to play error sound");
                }
                None
            }
        }
    }

    /// Wait for a wake signal, then listen until an intent is dispatched
    ///
    /// # Errors
    ///
    /// Returns error if wake detection, the pipeline, or feedback fails
    pub async fn attempt_interaction(&self) -> Result<CycleOutcome> {
        tracing::info!("waiting for wake word");
        self.wake.wait_for_wake().await?;
        tracing::info!("woken up");

        let attempts = self.listen.max_attempts;
        for attempt in 0..attempts {
            // A timeout most likely means the wake was unintended, so don't retry
            let Some(response) = self.listen_once(attempt).await? else {
                tracing::info!("no response within timeout, giving up");
                self.feedback.play(Sound::Error).await?;
                return Ok(CycleOutcome::TimedOut);
            };

            if response.intent_name().is_some() {
                let reply = self.intents.dispatch(&response, self.feedback.as_ref()).await?;
                return Ok(CycleOutcome::Dispatched(reply));
            }

            tracing::info!(
                attempt = attempt + 1,
                attempts,
                text = response.text(),
                "unable to determine an intent"
            );
        }

        tracing::info!("ran out of attempts, giving up");
        self.feedback.play(Sound::Error).await?;
        Ok(CycleOutcome::Exhausted)
    }

    /// One listening attempt
    ///
    /// The first attempt cues with an acknowledgement; retries cue with a
    /// question so the user knows they weren't understood. The listener is
    /// torn down before this returns, whatever happened.
    async fn listen_once(&self, attempt: u32) -> Result<Option<RecognitionResult>> {
        let mut handle = self
            .listener
            .start_listening(false, self.listen.timeout)
            .await?;

        let cue = if attempt == 0 { Sound::Ack } else { Sound::Question };
        let outcome = match self.feedback.play(cue).await {
            Ok(()) => handle.result().await,
            Err(e) => Err(e),
        };

        handle.cancel().await;
        outcome
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("listen", &self.listen)
            .field("intents", &self.intents.len())
            .finish_non_exhaustive()
    }
}
