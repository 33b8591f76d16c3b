//! Error types for voiced

use std::process::ExitStatus;

use thiserror::Error;

use crate::voice::Stage;

/// Result type alias for voiced operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voiced
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An external command exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// A speech pipeline stage exited unsuccessfully or died before becoming ready
    #[error("{stage} stage exited with {status}: {stderr}")]
    Pipeline {
        stage: Stage,
        status: ExitStatus,
        stderr: String,
    },

    /// A recognized intent has no matching registration
    #[error("no intent handler matches intent {intent:?}")]
    NoMatch { intent: String },

    /// Listener lifecycle error
    #[error("listen error: {0}")]
    Listen(String),

    /// Wake word detection error
    #[error("wake word error: {0}")]
    WakeWord(String),

    /// Audio feedback error
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
