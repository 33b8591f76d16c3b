//! Intent handlers and the dispatch table
//!
//! Handlers are registered at startup with an intent name and optional slot
//! constraints. Registrations are matched in order, first match wins:
//!
//! ```text
//! registry.register("music", &[("command", "favourite")], favourite);
//! registry.register("music", &[], music);
//! ```
//!
//! Here `music` only sees commands other than "favourite". Registered the
//! other way round, `favourite` would never run.

pub mod builtin;
mod registry;

pub use registry::{IntentRegistration, IntentRegistry};

use async_trait::async_trait;

use crate::voice::{Reply, Slots};

/// Business logic run for a recognized intent
///
/// Returning `None` acknowledges with the default cue. Errors are logged and
/// answered with the error cue; they never escape dispatch.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// Handle an utterance and its slot values
    async fn handle(&self, text: &str, slots: &Slots) -> anyhow::Result<Option<Reply>>;
}

#[async_trait]
impl<F> IntentHandler for F
where
    F: Fn(&str, &Slots) -> anyhow::Result<Option<Reply>> + Send + Sync,
{
    async fn handle(&self, text: &str, slots: &Slots) -> anyhow::Result<Option<Reply>> {
        self(text, slots)
    }
}
