//! TOML configuration file loading
//!
//! Supports `~/.config/voiced/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoicedConfigFile {
    /// Speech pipeline configuration
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Feedback sound configuration
    #[serde(default)]
    pub sounds: SoundsFileConfig,

    /// Music player control
    #[serde(default)]
    pub music: MusicFileConfig,
}

/// Speech pipeline configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Speech tool executable (e.g. "voice2json")
    pub command: Option<String>,

    /// Line the capture stage prints on stderr once it is listening
    pub ready_line: Option<String>,

    /// Seconds to wait for speech once listening
    pub timeout_secs: Option<u64>,

    /// Listen attempts per wake before giving up
    pub max_attempts: Option<u32>,

    /// Intents at or below this confidence are discarded
    pub min_confidence: Option<f64>,
}

/// Feedback sound configuration
#[derive(Debug, Default, Deserialize)]
pub struct SoundsFileConfig {
    pub ack: Option<PathBuf>,
    pub question: Option<PathBuf>,
    pub error: Option<PathBuf>,

    /// Audio player executable (e.g. "ffplay")
    pub player: Option<String>,

    /// Speech synthesizer executable (e.g. "espeak-ng")
    pub speech: Option<String>,
}

/// Music player control configuration
#[derive(Debug, Default, Deserialize)]
pub struct MusicFileConfig {
    /// Unix socket the music player reads control characters from
    pub control_socket: Option<PathBuf>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VoicedConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VoicedConfigFile {
    let Some(path) = config_file_path() else {
        return VoicedConfigFile::default();
    };

    if !path.exists() {
        return VoicedConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            VoicedConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML for this schema
pub fn read_config_file(path: &Path) -> crate::Result<VoicedConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/voiced/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voiced").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file() {
        let fc: VoicedConfigFile = toml::from_str(
            r#"
            [listen]
            timeout_secs = 5

            [sounds]
            player = "aplay"
            "#,
        )
        .unwrap();

        assert_eq!(fc.listen.timeout_secs, Some(5));
        assert!(fc.listen.command.is_none());
        assert_eq!(fc.sounds.player.as_deref(), Some("aplay"));
        assert!(fc.music.control_socket.is_none());
    }

    #[test]
    fn test_empty_file() {
        let fc: VoicedConfigFile = toml::from_str("").unwrap();
        assert!(fc.listen.max_attempts.is_none());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(toml::from_str::<VoicedConfigFile>("[persona]\nname = \"x\"").is_err());
    }

    #[test]
    fn test_read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[music]\ncontrol_socket = \"/run/player.sock\"\n").unwrap();

        let fc = read_config_file(&path).unwrap();
        assert_eq!(
            fc.music.control_socket,
            Some(PathBuf::from("/run/player.sock"))
        );
    }
}
