//! Configuration management for voiced

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::voice::Sound;
use crate::{Error, Result};

use file::VoicedConfigFile;

/// Default speech tool (provides `transcribe-stream`, `recognize-intent`, `wait-wake`)
pub const DEFAULT_SPEECH_COMMAND: &str = "voice2json";

/// Default stderr line announcing that the capture stage is listening
pub const DEFAULT_READY_LINE: &str = "Ready";

/// Default time to wait for speech once listening
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default listen attempts per wake
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default confidence an intent must exceed to be accepted
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// voiced configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Speech pipeline configuration
    pub listen: ListenConfig,

    /// Feedback sound configuration
    pub sounds: SoundsConfig,

    /// Music player control
    pub music: MusicConfig,
}

/// Speech pipeline configuration
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Speech tool executable
    pub command: String,

    /// Line the capture stage prints on stderr once it is listening
    pub ready_line: String,

    /// Time to wait for speech once listening
    pub timeout: Duration,

    /// Listen attempts per wake before giving up
    pub max_attempts: u32,

    /// Intents must have confidence strictly greater than this
    pub min_confidence: f64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_SPEECH_COMMAND.to_string(),
            ready_line: DEFAULT_READY_LINE.to_string(),
            timeout: DEFAULT_LISTEN_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Feedback sound configuration
#[derive(Debug, Clone)]
pub struct SoundsConfig {
    /// "Acknowledged" / "start talking" cue
    pub ack: PathBuf,

    /// "Didn't understand, try again" cue
    pub question: PathBuf,

    /// Failure cue
    pub error: PathBuf,

    /// Audio player executable, fed the sound file on stdin
    pub player: String,

    /// Speech synthesizer executable, given the text as its argument
    pub speech: String,
}

impl SoundsConfig {
    /// Sound file for a cue
    #[must_use]
    pub fn path(&self, sound: Sound) -> &PathBuf {
        match sound {
            Sound::Ack => &self.ack,
            Sound::Question => &self.question,
            Sound::Error => &self.error,
        }
    }
}

impl Default for SoundsConfig {
    fn default() -> Self {
        let dir = sounds_dir();
        Self {
            ack: dir.join("beep-ack.wav"),
            question: dir.join("beep-question.wav"),
            error: dir.join("beep-error.wav"),
            player: "ffplay".to_string(),
            speech: "espeak-ng".to_string(),
        }
    }
}

/// Music player control configuration
#[derive(Debug, Clone)]
pub struct MusicConfig {
    /// Unix socket the music player reads control characters from
    pub control_socket: PathBuf,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            control_socket: PathBuf::from("/tmp/awp.sock"),
        }
    }
}

/// Return the directory holding the bundled cue sounds
///
/// Uses `~/.local/share/voiced/sounds/` on Linux
pub fn sounds_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/voiced/sounds"),
        |d| d.data_dir().join("voiced").join("sounds"),
    )
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or out of range
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a config file overlay and environment lookups over the defaults
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or out of range
    pub fn resolve(fc: VoicedConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let timeout_secs = match env("VOICED_LISTEN_TIMEOUT") {
            Some(v) => Some(parse_env("VOICED_LISTEN_TIMEOUT", &v)?),
            None => fc.listen.timeout_secs,
        };
        let max_attempts = match env("VOICED_MAX_ATTEMPTS") {
            Some(v) => Some(parse_env("VOICED_MAX_ATTEMPTS", &v)?),
            None => fc.listen.max_attempts,
        };
        let min_confidence = match env("VOICED_MIN_CONFIDENCE") {
            Some(v) => Some(parse_env("VOICED_MIN_CONFIDENCE", &v)?),
            None => fc.listen.min_confidence,
        };

        let listen = ListenConfig {
            command: env("VOICED_SPEECH_COMMAND")
                .or(fc.listen.command)
                .unwrap_or(defaults.listen.command),
            ready_line: fc.listen.ready_line.unwrap_or(defaults.listen.ready_line),
            timeout: timeout_secs.map_or(defaults.listen.timeout, Duration::from_secs),
            max_attempts: max_attempts.unwrap_or(defaults.listen.max_attempts),
            min_confidence: min_confidence.unwrap_or(defaults.listen.min_confidence),
        };

        if listen.timeout.is_zero() {
            return Err(Error::Config("listen.timeout_secs must be positive".to_string()));
        }
        if listen.max_attempts == 0 {
            return Err(Error::Config("listen.max_attempts must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&listen.min_confidence) {
            return Err(Error::Config(format!(
                "listen.min_confidence must be within 0..=1, got {}",
                listen.min_confidence
            )));
        }

        let sounds_dir = env("VOICED_SOUNDS_DIR").map(PathBuf::from);
        let sound = |configured: Option<PathBuf>, file: &str, default: PathBuf| {
            configured
                .or_else(|| sounds_dir.as_ref().map(|d| d.join(file)))
                .unwrap_or(default)
        };

        let sounds = SoundsConfig {
            ack: sound(fc.sounds.ack, "beep-ack.wav", defaults.sounds.ack),
            question: sound(fc.sounds.question, "beep-question.wav", defaults.sounds.question),
            error: sound(fc.sounds.error, "beep-error.wav", defaults.sounds.error),
            player: env("VOICED_PLAYER")
                .or(fc.sounds.player)
                .unwrap_or(defaults.sounds.player),
            speech: env("VOICED_SPEECH")
                .or(fc.sounds.speech)
                .unwrap_or(defaults.sounds.speech),
        };

        let music = MusicConfig {
            control_socket: env("VOICED_MUSIC_SOCKET")
                .map(PathBuf::from)
                .or(fc.music.control_socket)
                .unwrap_or(defaults.music.control_socket),
        };

        Ok(Self {
            listen,
            sounds,
            music,
        })
    }

    /// External programs the daemon shells out to
    #[must_use]
    pub fn programs(&self) -> [&str; 3] {
        [
            self.listen.command.as_str(),
            self.sounds.player.as_str(),
            self.sounds.speech.as_str(),
        ]
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {key} {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(VoicedConfigFile::default(), env_of(&[])).unwrap();

        assert_eq!(config.listen.command, "voice2json");
        assert_eq!(config.listen.ready_line, "Ready");
        assert_eq!(config.listen.timeout, Duration::from_secs(10));
        assert_eq!(config.listen.max_attempts, 3);
        assert!((config.listen.min_confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.sounds.player, "ffplay");
        assert_eq!(config.music.control_socket, PathBuf::from("/tmp/awp.sock"));
    }

    #[test]
    fn test_env_overrides_file() {
        let fc: VoicedConfigFile = toml::from_str(
            r#"
            [listen]
            command = "/opt/voice2json/bin/voice2json"
            timeout_secs = 5
            max_attempts = 2
            "#,
        )
        .unwrap();

        let config = Config::resolve(fc, env_of(&[("VOICED_LISTEN_TIMEOUT", "7")])).unwrap();

        assert_eq!(config.listen.command, "/opt/voice2json/bin/voice2json");
        assert_eq!(config.listen.timeout, Duration::from_secs(7));
        assert_eq!(config.listen.max_attempts, 2);
    }

    #[test]
    fn test_sounds_dir_env() {
        let config = Config::resolve(
            VoicedConfigFile::default(),
            env_of(&[("VOICED_SOUNDS_DIR", "/usr/share/voiced")]),
        )
        .unwrap();

        assert_eq!(
            config.sounds.path(Sound::Question),
            &PathBuf::from("/usr/share/voiced/beep-question.wav")
        );
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let result = Config::resolve(
            VoicedConfigFile::default(),
            env_of(&[("VOICED_MAX_ATTEMPTS", "0")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_env() {
        let result = Config::resolve(
            VoicedConfigFile::default(),
            env_of(&[("VOICED_LISTEN_TIMEOUT", "soon")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
