//! Ordered intent dispatch table

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::IntentHandler;
use crate::voice::{Feedback, RecognitionResult, Reply, Slots, Sound};
use crate::{Error, Result};

/// One entry of the dispatch table
pub struct IntentRegistration {
    name: String,
    constraints: BTreeMap<String, String>,
    handler: Arc<dyn IntentHandler>,
}

impl IntentRegistration {
    /// Intent name this entry handles
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot values that must match exactly
    #[must_use]
    pub const fn constraints(&self) -> &BTreeMap<String, String> {
        &self.constraints
    }

    /// Whether this entry handles the intent with these slots
    #[must_use]
    pub fn matches(&self, name: &str, slots: &Slots) -> bool {
        self.name == name
            && self
                .constraints
                .iter()
                .all(|(key, value)| slots.get(key) == Some(value))
    }
}

impl fmt::Debug for IntentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRegistration")
            .field("name", &self.name)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for IntentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.constraints {
            write!(f, " {key}={value:?}")?;
        }
        Ok(())
    }
}

/// Intent registrations, matched in registration order
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Default)]
pub struct IntentRegistry {
    entries: Vec<IntentRegistration>,
}

impl IntentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `name`, restricted to slots matching `constraints`
    ///
    /// More specific registrations must come before general ones for the same
    /// name, or they will be shadowed.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constraints: &[(&str, &str)],
        handler: impl IntentHandler + 'static,
    ) -> &mut Self {
        let entry = IntentRegistration {
            name: name.into(),
            constraints: constraints
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            handler: Arc::new(handler),
        };

        tracing::debug!(intent = %entry, position = self.entries.len(), "registered intent");
        self.entries.push(entry);
        self
    }

    /// Registrations in match order
    pub fn iter(&self) -> impl Iterator<Item = &IntentRegistration> {
        self.entries.iter()
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first registration handling this intent
    ///
    /// # Errors
    ///
    /// Returns `Error::NoMatch` if no registration matches
    pub fn resolve(&self, name: &str, slots: &Slots) -> Result<&IntentRegistration> {
        self.entries
            .iter()
            .find(|entry| entry.matches(name, slots))
            .ok_or_else(|| Error::NoMatch {
                intent: name.to_string(),
            })
    }

    /// Run the handler for a recognition and give exactly one piece of feedback
    ///
    /// Handler failures and unmatched intents are logged and answered with
    /// the error cue. Returns the reply that was delivered.
    ///
    /// # Errors
    ///
    /// Returns error only if delivering the feedback fails
    pub async fn dispatch(&self, response: &RecognitionResult, feedback: &dyn Feedback) -> Result<Reply> {
        let reply = self.run(response).await;
        tracing::debug!(?reply, "delivering reply");
        reply.deliver(feedback).await?;
        Ok(reply)
    }

    async fn run(&self, response: &RecognitionResult) -> Reply {
        let Some(name) = response.intent_name() else {
            tracing::error!(?response, "dispatch called without an intent");
            return Reply::Sound(Sound::Error);
        };

        let entry = match self.resolve(name, response.slots()) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(error = %e, ?response, "no handler registered for intent");
                return Reply::Sound(Sound::Error);
            }
        };

        tracing::debug!(handler = %entry, ?response, "found matching handler");

        match entry.handler.handle(response.text(), response.slots()).await {
            Ok(reply) => {
                tracing::debug!(handler = %entry, ?reply, "handler returned");
                reply.unwrap_or(Reply::Sound(Sound::Ack))
            }
            Err(e) => {
                tracing::error!(
                    handler = %entry,
                    error = ?e,
                    ?response,
                    "intent handler failed"
                );
                Reply::Sound(Sound::Error)
            }
        }
    }
}
