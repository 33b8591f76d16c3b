//! voiced - Voice-activated command dispatcher
//!
//! Waits for a wake word, listens through an external speech pipeline, maps
//! the recognized intent to a registered handler, and answers with a cue
//! sound:
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌──────────────┐
//! │  Wake    │──▶│  Listener                    │──▶│  Intent      │
//! │  word    │   │  capture ─▶ interpretation   │   │  registry    │
//! └──────────┘   └──────────────────────────────┘   └──────┬───────┘
//!      ▲                    retry (≤ 3)                    │
//!      └───────────────── cue sound ◀──── handler ◀────────┘
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod intent;
pub mod process;
pub mod voice;

pub use config::Config;
pub use daemon::{CycleOutcome, Daemon};
pub use error::{Error, Result};
pub use intent::{IntentHandler, IntentRegistration, IntentRegistry};
pub use voice::{RecognitionResult, Reply, Slots, Sound};
