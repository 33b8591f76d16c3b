//! Voice processing module
//!
//! Handles wake word detection, the listen pipeline, and audible feedback.
//! Speech recognition itself runs in an external tool (see `listener.rs`).

mod listener;
mod playback;
mod recognition;
mod wake_word;

pub use listener::{ListenHandle, ListenOutcome, Listener, SpeechPipeline, Stage};
pub use playback::{AudioPlayback, Feedback, Reply, Sound};
pub use recognition::{RecognitionResult, Slots, parse_intent, parse_transcription};
pub use wake_word::{CommandWakeDetector, WakeDetector};
