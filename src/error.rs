//! Error types for subvox.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubvoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // Translation errors
    #[error("Translation failed: {message}")]
    Translation { message: String },

    // Pipeline lifecycle errors
    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SubvoxError>;

impl SubvoxError {
    /// Shorthand for rejecting a bad construction-time parameter on a named key.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        SubvoxError::ConfigInvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
