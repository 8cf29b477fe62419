//! Command-line interface for subvox
//!
//! Provides argument parsing using clap derive macros.

use crate::config::{BoundaryMode, Config};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Live subtitles from speech, translated on the fly
#[derive(Parser, Debug)]
#[command(
    name = "subvox",
    version,
    about = "Live subtitles from speech, translated on the fly"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (subtitles only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (e.g., hw:0)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Replay a WAV file instead of capturing from the microphone
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Whisper model file
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Language code for transcription (auto, en, de, es, ...)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Utterance boundary strategy
    #[arg(long, value_name = "MODE", value_enum)]
    pub mode: Option<BoundaryMode>,

    /// RMS level separating speech from silence
    #[arg(long, value_name = "LEVEL")]
    pub rms_threshold: Option<f64>,

    /// Source language for translation
    #[arg(long, value_name = "LANG")]
    pub source_lang: Option<String>,

    /// Target language for translation
    #[arg(long, value_name = "LANG")]
    pub target_lang: Option<String>,

    /// Translate inline on the pipeline thread instead of in the background
    #[arg(long)]
    pub sync: bool,

    /// Print only translations, hiding source lines
    #[arg(long)]
    pub no_source: bool,

    /// Print committed lines as JSON objects, one per line
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Fold command-line overrides into a loaded configuration. Flags beat
    /// the file; unset flags leave the file's values alone.
    pub fn merged_config(&self, mut config: Config) -> Config {
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(model) = &self.model {
            config.stt.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(mode) = self.mode {
            config.boundary.mode = mode;
        }
        if let Some(threshold) = self.rms_threshold {
            config.boundary.rms_threshold = threshold;
        }
        if let Some(source) = &self.source_lang {
            config.translate.source_lang = source.clone();
        }
        if let Some(target) = &self.target_lang {
            config.translate.target_lang = target.clone();
        }
        if self.sync {
            config.translate.sync = true;
        }
        if self.no_source {
            config.display.show_source = false;
        }
        config
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    #[cfg(feature = "cpal-audio")]
    Devices,

    /// View and initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init,
}
