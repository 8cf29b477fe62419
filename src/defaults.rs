//! Default configuration constants for subvox.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default channel count for capture.
pub const CHANNELS: u16 = 1;

/// Default capture chunk duration in seconds.
///
/// Half-second chunks keep end-of-utterance latency low while leaving the
/// energy gate enough samples for a stable RMS estimate.
pub const CHUNK_SEC: f64 = 0.5;

/// Default RMS speech threshold in raw PCM16 sample units.
///
/// RMS here is computed over un-normalized 16-bit sample values, so the
/// useful range is roughly 0 (digital silence) to 32767 (full scale).
/// 250 is tuned for typical laptop microphone noise floors.
pub const RMS_THRESHOLD: f64 = 250.0;

/// Default number of consecutive silent chunks that finalize an utterance
/// in energy-gate mode.
pub const SILENCE_CHUNKS: u32 = 2;

/// Default minimum utterance duration in seconds.
///
/// Finalized utterances shorter than this are skipped without transcription;
/// they are almost always coughs, clicks or chair squeaks.
pub const MIN_UTTER_SEC: f64 = 0.6;

/// Default maximum utterance duration in seconds before a forced finalize.
///
/// Bounds both memory growth and subtitle latency during continuous speech.
pub const MAX_UTTER_SEC: f64 = 6.0;

/// Default VAD frame duration in milliseconds (frame-VAD mode).
pub const FRAME_MS: u32 = 20;

/// Frame durations the frame-level VAD accepts, in milliseconds.
pub const ALLOWED_FRAME_MS: [u32; 3] = [10, 20, 30];

/// Sample rates the frame-level VAD accepts, in Hz.
pub const ALLOWED_VAD_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

/// Default minimum accumulated speech in milliseconds for the frame-VAD
/// chunker to emit an utterance instead of discarding it.
pub const MIN_SPEECH_MS: u32 = 200;

/// Default trailing silence in milliseconds that finalizes an utterance
/// in frame-VAD mode.
pub const END_SILENCE_MS: u32 = 500;

/// Longest run of consecutive identical words the text filter keeps.
pub const MAX_WORD_REPEAT: usize = 2;

/// Default pause gap in seconds that forces a subtitle line commit.
pub const GAP_SEC: f64 = 0.9;

/// Default hard ceiling on merged subtitle line length in characters.
pub const HARD_MAX_CHARS: usize = 140;

/// Smallest hard ceiling the segmenter will accept; shorter lines make the
/// emergency commit fire on nearly every fragment.
pub const HARD_MAX_CHARS_FLOOR: usize = 20;

/// Default capacity of the translation backpressure queue.
pub const TRANSLATE_QUEUE_CAPACITY: usize = 200;

/// Default capacity of the subtitle bus between pipeline and display.
pub const SUBTITLE_BUS_CAPACITY: usize = 100;

/// Default capacity of the capture-to-pipeline chunk channel.
///
/// At the default chunk duration this buffers about 16 seconds of audio,
/// enough to ride out a slow transcription without dropping capture.
pub const CHUNK_BUFFER: usize = 32;

/// Default display poll interval in milliseconds.
pub const POLL_MS: u64 = 60;

/// Default cap on subtitle lines applied to the display per poll tick.
pub const MAX_UPDATES_PER_TICK: usize = 20;

/// Default number of lines kept in the display window.
pub const MAX_LINES: usize = 4;

/// Default source language code for translation requests.
pub const SOURCE_LANG: &str = "en";

/// Default target language code for translation requests.
pub const TARGET_LANG: &str = "ja";

/// Default transcription language code.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Poll timeout for the translation worker's blocking dequeue, in
/// milliseconds. Short enough that a stop request is observed promptly.
pub const WORKER_POLL_MS: u64 = 200;

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
/// Only one GPU backend can be active at a time; if none is enabled, returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else if cfg!(feature = "hipblas") {
        "HipBLAS (AMD)"
    } else if cfg!(feature = "openblas") {
        "OpenBLAS"
    } else {
        "CPU"
    }
}
