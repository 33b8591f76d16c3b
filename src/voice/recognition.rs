//! Recognition results and the speech tool's JSON output

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Named values captured alongside an intent (e.g. `command = "pause"`)
pub type Slots = HashMap<String, String>;

/// What the listener heard
///
/// An intent name is only present when interpretation was confident; slots
/// are always empty without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionResult {
    text: String,
    intent: Option<String>,
    slots: Slots,
}

impl RecognitionResult {
    /// Speech with no recognized intent
    #[must_use]
    pub fn unrecognized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
            slots: Slots::new(),
        }
    }

    /// Speech interpreted as a named intent
    ///
    /// An empty name is no intent at all: the result is unrecognized and the
    /// slots are dropped.
    #[must_use]
    pub fn recognized(text: impl Into<String>, intent: impl Into<String>, slots: Slots) -> Self {
        let intent = intent.into();
        if intent.is_empty() {
            return Self::unrecognized(text);
        }

        Self {
            text: text.into(),
            intent: Some(intent),
            slots,
        }
    }

    /// Raw transcribed utterance
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Recognized intent, if any
    #[must_use]
    pub fn intent_name(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    /// Slot values for the recognized intent
    #[must_use]
    pub const fn slots(&self) -> &Slots {
        &self.slots
    }
}

/// Open-mode transcription event from the capture stage
#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

/// Intent event from the interpretation stage
#[derive(Debug, Deserialize)]
struct IntentEvent {
    raw_text: String,
    #[serde(default)]
    intent: IntentField,
    #[serde(default)]
    slots: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct IntentField {
    #[serde(default)]
    name: String,
    #[serde(default)]
    confidence: f64,
}

/// Parse the capture stage's open-mode output
///
/// # Errors
///
/// Returns error if the output is not a transcription event
pub fn parse_transcription(output: &str) -> Result<RecognitionResult> {
    let event: Transcription = serde_json::from_str(output.trim())?;
    Ok(RecognitionResult::unrecognized(event.text))
}

/// Parse the interpretation stage's output
///
/// The intent is kept only when it is named and its confidence is strictly
/// greater than `min_confidence`.
///
/// # Errors
///
/// Returns error if the output is not an intent event
pub fn parse_intent(output: &str, min_confidence: f64) -> Result<RecognitionResult> {
    let event: IntentEvent = serde_json::from_str(output.trim())?;

    if event.intent.name.is_empty() || event.intent.confidence <= min_confidence {
        tracing::debug!(
            intent = %event.intent.name,
            confidence = event.intent.confidence,
            "intent rejected"
        );
        return Ok(RecognitionResult::unrecognized(event.raw_text));
    }

    let slots = event
        .slots
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect();

    Ok(RecognitionResult::recognized(
        event.raw_text,
        event.intent.name,
        slots,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confident_intent() {
        let output = r#"{
            "text": "pause the music",
            "raw_text": "pause the music",
            "intent": {"name": "music", "confidence": 0.9},
            "slots": {"command": "pause"}
        }"#;

        let result = parse_intent(output, 0.5).unwrap();
        assert_eq!(result.text(), "pause the music");
        assert_eq!(result.intent_name(), Some("music"));
        assert_eq!(result.slots().get("command").map(String::as_str), Some("pause"));
    }

    #[test]
    fn test_empty_intent_name_is_unrecognized() {
        let output = r#"{"raw_text": "what", "intent": {"name": "", "confidence": 1.0}, "slots": {}}"#;

        let result = parse_intent(output, 0.5).unwrap();
        assert_eq!(result.text(), "what");
        assert_eq!(result.intent_name(), None);
        assert!(result.slots().is_empty());
    }

    #[test]
    fn test_recognized_with_empty_name() {
        let slots = Slots::from([("command".to_string(), "pause".to_string())]);

        let result = RecognitionResult::recognized("pause", "", slots);
        assert_eq!(result.text(), "pause");
        assert_eq!(result.intent_name(), None);
        assert!(result.slots().is_empty());
    }

    #[test]
    fn test_confidence_must_exceed_threshold() {
        let at = r#"{"raw_text": "skip", "intent": {"name": "music", "confidence": 0.5}, "slots": {"command": "skip"}}"#;
        let above = r#"{"raw_text": "skip", "intent": {"name": "music", "confidence": 0.51}, "slots": {"command": "skip"}}"#;

        let rejected = parse_intent(at, 0.5).unwrap();
        assert_eq!(rejected.intent_name(), None);
        assert!(rejected.slots().is_empty());

        assert_eq!(parse_intent(above, 0.5).unwrap().intent_name(), Some("music"));
    }

    #[test]
    fn test_non_string_slots_rendered() {
        let output = r#"{"raw_text": "set volume to 7", "intent": {"name": "volume", "confidence": 0.8}, "slots": {"level": 7, "relative": false}}"#;

        let result = parse_intent(output, 0.5).unwrap();
        assert_eq!(result.slots().get("level").map(String::as_str), Some("7"));
        assert_eq!(result.slots().get("relative").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_missing_intent_field() {
        let result = parse_intent(r#"{"raw_text": "hmm"}"#, 0.5).unwrap();
        assert_eq!(result.intent_name(), None);
    }

    #[test]
    fn test_parse_transcription() {
        let result = parse_transcription("{\"text\": \"buy more coffee\"}\n").unwrap();
        assert_eq!(result.text(), "buy more coffee");
        assert_eq!(result.intent_name(), None);
    }

    #[test]
    fn test_garbage_output_is_error() {
        assert!(parse_intent("not json", 0.5).is_err());
        assert!(parse_transcription("").is_err());
    }
}
