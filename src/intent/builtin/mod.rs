//! Built-in intent handlers

mod basic;
mod music;

pub use basic::cancel;
pub use music::{MusicHandler, control_sequence};

use super::IntentRegistry;
use crate::Config;

/// Register the built-in intents
///
/// Call before registering more general handlers for the same intent names.
pub fn register_all(registry: &mut IntentRegistry, config: &Config) {
    registry
        .register("cancel", &[], cancel)
        .register(
            "music",
            &[],
            MusicHandler::new(config.music.control_socket.clone()),
        );
}
