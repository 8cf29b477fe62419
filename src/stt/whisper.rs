//! Whisper-based utterance transcription.
//!
//! This module provides a Whisper implementation of the UtteranceTranscriber
//! trait using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. To build with Whisper support:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{Result, SubvoxError};
use crate::stt::transcriber::{RecognizedSegment, UtteranceTranscriber};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use crate::audio::frame_vad::first_channel;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Sample rate Whisper models are trained on.
#[cfg(feature = "whisper")]
const WHISPER_RATE: u32 = 16000;

/// Configuration for the Whisper transcriber.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es", "fr"), or "auto"
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-based transcriber implementation.
///
/// Down-mixes to the first channel, resamples to 16kHz when needed, and
/// reports segment timestamps as global stream offsets. A Mutex serializes
/// access to the WhisperContext so one instance can be shared across threads.
///
/// Real inference requires the `whisper` feature; without it a stub that
/// fails on every utterance is compiled instead.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Stand-in compiled when the `whisper` feature is off. Construction still
/// validates the model path; transcription always fails.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    model_name: String,
}

fn model_name_of(config: &WhisperConfig) -> String {
    config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Errors
    /// Returns `TranscriptionModelNotFound` if the model file doesn't exist
    /// and `Transcription` if model loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(SubvoxError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_of(&config);

        let mut context_params = WhisperContextParameters::default();
        // Enable flash attention: uses fused attention kernels that avoid the standalone
        // softmax CUDA kernel, which crashes on Blackwell GPUs (sm_120) with ggml <= 1.7.6
        context_params.flash_attn(true);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| SubvoxError::Transcription {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| SubvoxError::Transcription {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Validates the model path like the real transcriber would, then builds
    /// a stub that rejects every utterance.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(SubvoxError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_of(&config);
        Ok(Self { model_name })
    }
}

/// Convert i16 audio samples to f32 normalized to [-1.0, 1.0].
///
/// Whisper expects audio in f32 format normalized to the range [-1.0, 1.0].
/// Input is 16-bit PCM audio where samples range from -32768 to 32767.
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = src_pos - idx as f64;

            if idx + 1 < samples.len() {
                let a = samples[idx] as f64;
                let b = samples[idx + 1] as f64;
                (a + (b - a) * frac) as i16
            } else {
                samples[samples.len() - 1]
            }
        })
        .collect()
}

#[cfg(feature = "whisper")]
impl UtteranceTranscriber for WhisperTranscriber {
    fn transcribe_utterance(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        utter_t0: f64,
    ) -> Result<Vec<RecognizedSegment>> {
        let mono = first_channel(samples, channels);
        let mono = if sample_rate == WHISPER_RATE {
            mono
        } else {
            resample(&mono, sample_rate, WHISPER_RATE)
        };
        let audio_f32 = convert_audio(&mono);

        let context = self
            .context
            .lock()
            .map_err(|e| SubvoxError::Transcription {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| SubvoxError::Transcription {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| SubvoxError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        // Segment timestamps arrive in 10ms units relative to the utterance.
        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment.to_string().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let rel_t0 = segment.start_timestamp() as f64 / 100.0;
            let rel_t1 = segment.end_timestamp() as f64 / 100.0;
            segments.push(RecognizedSegment::new(
                text,
                utter_t0 + rel_t0,
                utter_t0 + rel_t1,
            ));
        }

        Ok(segments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl UtteranceTranscriber for WhisperTranscriber {
    fn transcribe_utterance(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
        _channels: u16,
        _utter_t0: f64,
    ) -> Result<Vec<RecognizedSegment>> {
        Err(SubvoxError::Transcription {
            message: "Whisper support not compiled in. Rebuild with --features whisper".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
