//! subvox - Live subtitles from speech, translated on the fly
//!
//! Captures chunked audio, detects utterance boundaries, transcribes each
//! utterance, regroups the text into subtitle-sized lines and translates
//! them, publishing display-ready lines on a bounded drop-oldest bus.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod bus;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod stt;
pub mod text;
pub mod translate;

// Core capabilities (capture → transcribe → translate)
pub use audio::source::AudioSource;
pub use stt::transcriber::UtteranceTranscriber;
pub use translate::{TranslationRequest, Translator};

// Pipeline
pub use pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineHandle};

// Display side
pub use bus::DropOldestQueue;
pub use display::{DisplayLine, DisplayWindow, SubtitleBus};

// Error handling
pub use error::{Result, SubvoxError};

// Config
pub use config::{BoundaryMode, Config};

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.0+abc1234"` when git hash is available, `"0.3.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
