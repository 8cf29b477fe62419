use crate::defaults;
use crate::error::{Result, SubvoxError};
use crate::pipeline::PipelineConfig;
use crate::stt::WhisperConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub boundary: BoundaryConfig,
    pub segmenter: SegmenterConfig,
    pub translate: TranslateConfig,
    pub display: DisplayConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_sec: f64,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: PathBuf,
    pub language: String,
    pub threads: Option<usize>,
}

/// Utterance boundary strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BoundaryMode {
    Energy,
    FrameVad,
}

/// Utterance boundary configuration
///
/// `rms_threshold`, `silence_chunks`, `min_utter_sec` and `max_utter_sec`
/// drive the energy strategy; `frame_ms`, `min_speech_ms` and
/// `end_silence_ms` drive the frame-VAD strategy. Out-of-range values are
/// rejected by the strategy constructors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoundaryConfig {
    pub mode: BoundaryMode,
    pub rms_threshold: f64,
    pub silence_chunks: u32,
    pub min_utter_sec: f64,
    pub max_utter_sec: Option<f64>,
    pub frame_ms: u32,
    pub min_speech_ms: u32,
    pub end_silence_ms: u32,
}

/// Line assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    pub gap_sec: f64,
    pub hard_max_chars: usize,
}

/// Translation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslateConfig {
    pub source_lang: String,
    pub target_lang: String,
    pub sync: bool,
    pub queue_capacity: usize,
}

/// Subtitle rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_lines: usize,
    pub poll_ms: u64,
    pub max_updates_per_tick: usize,
    pub show_source: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            chunk_sec: defaults::CHUNK_SEC,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            mode: BoundaryMode::Energy,
            rms_threshold: defaults::RMS_THRESHOLD,
            silence_chunks: defaults::SILENCE_CHUNKS,
            min_utter_sec: defaults::MIN_UTTER_SEC,
            max_utter_sec: Some(defaults::MAX_UTTER_SEC),
            frame_ms: defaults::FRAME_MS,
            min_speech_ms: defaults::MIN_SPEECH_MS,
            end_silence_ms: defaults::END_SILENCE_MS,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            gap_sec: defaults::GAP_SEC,
            hard_max_chars: defaults::HARD_MAX_CHARS,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            source_lang: defaults::SOURCE_LANG.to_string(),
            target_lang: defaults::TARGET_LANG.to_string(),
            sync: false,
            queue_capacity: defaults::TRANSLATE_QUEUE_CAPACITY,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_lines: defaults::MAX_LINES,
            poll_ms: defaults::POLL_MS,
            max_updates_per_tick: defaults::MAX_UPDATES_PER_TICK,
            show_source: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file does
    /// not exist. Invalid TOML is still an error; a broken config file must
    /// never be silently ignored.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(SubvoxError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SUBVOX_MODEL → stt.model
    /// - SUBVOX_LANGUAGE → stt.language
    /// - SUBVOX_AUDIO_DEVICE → audio.device
    /// - SUBVOX_TARGET_LANG → translate.target_lang
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("SUBVOX_MODEL")
            && !model.is_empty()
        {
            self.stt.model = PathBuf::from(model);
        }

        if let Ok(language) = std::env::var("SUBVOX_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(device) = std::env::var("SUBVOX_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(target) = std::env::var("SUBVOX_TARGET_LANG")
            && !target.is_empty()
        {
            self.translate.target_lang = target;
        }

        self
    }

    /// Apply the documented floors: `segmenter.gap_sec` is clamped to 0.0 and
    /// `segmenter.hard_max_chars` to the hard-max floor. These are the only
    /// values adjusted silently; everything else out of range is an error.
    pub fn resolved(mut self) -> Self {
        if self.segmenter.gap_sec < 0.0 {
            debug!(gap_sec = self.segmenter.gap_sec, "gap_sec below floor, clamped to 0.0");
            self.segmenter.gap_sec = 0.0;
        }
        if self.segmenter.hard_max_chars < defaults::HARD_MAX_CHARS_FLOOR {
            debug!(
                hard_max_chars = self.segmenter.hard_max_chars,
                floor = defaults::HARD_MAX_CHARS_FLOOR,
                "hard_max_chars below floor, clamped"
            );
            self.segmenter.hard_max_chars = defaults::HARD_MAX_CHARS_FLOOR;
        }
        self
    }

    /// Reject structurally unusable values before any component is built.
    ///
    /// Strategy-specific ranges (thresholds, frame durations, VAD rates) are
    /// checked by the component constructors; this catches only what every
    /// run needs.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(SubvoxError::invalid("sample_rate", "must be positive"));
        }
        if self.audio.channels == 0 {
            return Err(SubvoxError::invalid("channels", "must be at least 1"));
        }
        if self.audio.chunk_sec <= 0.0 {
            return Err(SubvoxError::invalid(
                "chunk_sec",
                format!("must be positive, got {}", self.audio.chunk_sec),
            ));
        }
        if self.translate.queue_capacity == 0 {
            return Err(SubvoxError::invalid("queue_capacity", "must be at least 1"));
        }
        if self.display.max_lines == 0 {
            return Err(SubvoxError::invalid("max_lines", "must be at least 1"));
        }
        if self.display.poll_ms == 0 {
            return Err(SubvoxError::invalid("poll_ms", "must be at least 1"));
        }
        if self.display.max_updates_per_tick == 0 {
            return Err(SubvoxError::invalid(
                "max_updates_per_tick",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sync_translate: self.translate.sync,
            source_lang: self.translate.source_lang.clone(),
            target_lang: self.translate.target_lang.clone(),
            gap_sec: self.segmenter.gap_sec,
            hard_max_chars: self.segmenter.hard_max_chars,
            queue_capacity: self.translate.queue_capacity,
            ..PipelineConfig::default()
        }
    }

    /// Transcriber settings derived from this configuration.
    pub fn whisper_config(&self) -> WhisperConfig {
        WhisperConfig {
            model_path: self.stt.model.clone(),
            language: self.stt.language.clone(),
            threads: self.stt.threads,
        }
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/subvox/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            SubvoxError::invalid("config_path", "no user configuration directory")
        })?;
        Ok(base.join("subvox").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_subvox_env() {
        remove_env("SUBVOX_MODEL");
        remove_env("SUBVOX_LANGUAGE");
        remove_env("SUBVOX_AUDIO_DEVICE");
        remove_env("SUBVOX_TARGET_LANG");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        // Audio defaults
        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.chunk_sec, 0.5);

        // Boundary defaults
        assert_eq!(config.boundary.mode, BoundaryMode::Energy);
        assert_eq!(config.boundary.rms_threshold, 250.0);
        assert_eq!(config.boundary.silence_chunks, 2);
        assert_eq!(config.boundary.min_utter_sec, 0.6);
        assert_eq!(config.boundary.max_utter_sec, Some(6.0));
        assert_eq!(config.boundary.frame_ms, 20);
        assert_eq!(config.boundary.min_speech_ms, 200);
        assert_eq!(config.boundary.end_silence_ms, 500);

        // Segmenter defaults
        assert_eq!(config.segmenter.gap_sec, 0.9);
        assert_eq!(config.segmenter.hard_max_chars, 140);

        // Translation defaults
        assert_eq!(config.translate.source_lang, "en");
        assert_eq!(config.translate.target_lang, "ja");
        assert!(!config.translate.sync);
        assert_eq!(config.translate.queue_capacity, 200);

        // Display defaults
        assert_eq!(config.display.max_lines, 4);
        assert_eq!(config.display.poll_ms, 60);
        assert_eq!(config.display.max_updates_per_tick, 20);
        assert!(config.display.show_source);

        // Transcription defaults
        assert_eq!(config.stt.model, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.stt.language, "en");
        assert_eq!(config.stt.threads, None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [audio]
            device = "hw:0,0"
            sample_rate = 48000
            channels = 2
            chunk_sec = 0.25

            [stt]
            model = "models/ggml-large-v3.bin"
            language = "es"
            threads = 4

            [boundary]
            mode = "frame-vad"
            rms_threshold = 400.0
            min_speech_ms = 300

            [segmenter]
            gap_sec = 1.2
            hard_max_chars = 80

            [translate]
            source_lang = "es"
            target_lang = "en"
            sync = true
            queue_capacity = 16

            [display]
            max_lines = 2
            show_source = false
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.device, Some("hw:0,0".to_string()));
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.audio.chunk_sec, 0.25);

        assert_eq!(config.stt.model, PathBuf::from("models/ggml-large-v3.bin"));
        assert_eq!(config.stt.language, "es");
        assert_eq!(config.stt.threads, Some(4));

        assert_eq!(config.boundary.mode, BoundaryMode::FrameVad);
        assert_eq!(config.boundary.rms_threshold, 400.0);
        assert_eq!(config.boundary.min_speech_ms, 300);
        // Untouched boundary fields keep their defaults
        assert_eq!(config.boundary.frame_ms, 20);

        assert_eq!(config.segmenter.gap_sec, 1.2);
        assert_eq!(config.segmenter.hard_max_chars, 80);

        assert_eq!(config.translate.source_lang, "es");
        assert_eq!(config.translate.target_lang, "en");
        assert!(config.translate.sync);
        assert_eq!(config.translate.queue_capacity, 16);

        assert_eq!(config.display.max_lines, 2);
        assert!(!config.display.show_source);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [translate]
            target_lang = "de"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.translate.target_lang, "de");

        // Everything else should be defaults
        assert_eq!(config.translate.source_lang, "en");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.boundary.mode, BoundaryMode::Energy);
        assert_eq!(config.segmenter.hard_max_chars, 140);
        assert_eq!(config.display.max_lines, 4);
    }

    #[test]
    fn test_env_override_model() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_subvox_env();

        set_env("SUBVOX_MODEL", "models/ggml-tiny.bin");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.model, PathBuf::from("models/ggml-tiny.bin"));
        assert_eq!(config.stt.language, "en"); // Not overridden

        clear_subvox_env();
    }

    #[test]
    fn test_env_override_device_and_target_lang() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_subvox_env();

        set_env("SUBVOX_AUDIO_DEVICE", "hw:1,0");
        set_env("SUBVOX_TARGET_LANG", "fr");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.audio.device, Some("hw:1,0".to_string()));
        assert_eq!(config.translate.target_lang, "fr");

        clear_subvox_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_subvox_env();

        set_env("SUBVOX_LANGUAGE", "");
        let config = Config::default().with_env_overrides();

        // Empty string should not override default
        assert_eq!(config.stt.language, "en");

        clear_subvox_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());

        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_boundary_mode_is_rejected() {
        let toml_content = r#"
            [boundary]
            mode = "psychic"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_subvox_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_propagates_invalid_toml() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        // Invalid TOML must surface as an error, not fall back to defaults
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_resolved_applies_documented_floors() {
        let mut config = Config::default();
        config.segmenter.gap_sec = -1.0;
        config.segmenter.hard_max_chars = 5;

        let resolved = config.resolved();

        assert_eq!(resolved.segmenter.gap_sec, 0.0);
        assert_eq!(resolved.segmenter.hard_max_chars, 20);
    }

    #[test]
    fn test_resolved_leaves_valid_values_alone() {
        let config = Config::default().resolved();
        assert_eq!(config.segmenter.gap_sec, 0.9);
        assert_eq!(config.segmenter.hard_max_chars, 140);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sample_rate() {
        let mut config = Config::default();
        config.audio.sample_rate = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sample_rate"));
    }

    #[test]
    fn test_validate_rejects_zero_queue_capacity() {
        let mut config = Config::default();
        config.translate.queue_capacity = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue_capacity"));
    }

    #[test]
    fn test_pipeline_config_mirrors_sections() {
        let mut config = Config::default();
        config.translate.sync = true;
        config.translate.target_lang = "ko".to_string();
        config.segmenter.gap_sec = 1.5;
        config.translate.queue_capacity = 8;

        let pipeline = config.pipeline_config();

        assert!(pipeline.sync_translate);
        assert_eq!(pipeline.target_lang, "ko");
        assert_eq!(pipeline.gap_sec, 1.5);
        assert_eq!(pipeline.queue_capacity, 8);
        // Internals not exposed through the file keep library defaults
        assert_eq!(pipeline.bus_capacity, 100);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path().unwrap();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("subvox"));
        assert!(path_str.ends_with("config.toml"));
    }
}
