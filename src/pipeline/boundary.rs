//! Utterance boundary detection.
//!
//! Two strategies behind one trait: [`EnergyBoundary`] decides per captured
//! chunk from whole-buffer RMS, [`FrameVadBoundary`] sub-frames each chunk
//! and tracks speech at 10-30 ms resolution. The orchestrator drives either
//! through [`UtteranceBoundary`] without knowing which is active.

use crate::audio::chunk::AudioChunk;
use crate::audio::energy::EnergyGate;
use crate::audio::frame_vad::{FrameClassifier, FrameVad, first_channel};
use crate::error::{Result, SubvoxError};
use tracing::debug;

/// Splits a chunk stream into finalized utterances.
///
/// Implementations are owned state machines driven by exactly one thread.
/// A finalized utterance is an immutable [`AudioChunk`] handed off exactly
/// once for transcription.
pub trait UtteranceBoundary: Send {
    /// Feed one captured chunk; returns every utterance it finalized.
    fn push_chunk(&mut self, chunk: &AudioChunk) -> Vec<AudioChunk>;

    /// Signal stream end; finalizes the open utterance if it qualifies.
    fn finish(&mut self) -> Option<AudioChunk>;
}

/// Open utterance accumulated by the energy boundary.
#[derive(Debug)]
struct OpenUtterance {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    start: f64,
}

impl OpenUtterance {
    fn begin(chunk: &AudioChunk) -> Self {
        Self {
            samples: Vec::with_capacity(chunk.samples.len() * 4),
            sample_rate: chunk.sample_rate,
            channels: chunk.channels,
            start: chunk.start,
        }
    }

    fn duration(&self) -> f64 {
        crate::audio::chunk::duration_of(self.samples.len(), self.sample_rate, self.channels)
    }
}

/// Chunk-granular boundary driven by the RMS energy gate.
///
/// A run of `silence_chunks` consecutive silent chunks closes the utterance;
/// silent chunks are not accumulated, so the emitted duration covers speech
/// only. An optional maximum duration force-finalizes mid-speech, bounding
/// both memory and subtitle latency during continuous talk.
#[derive(Debug)]
pub struct EnergyBoundary {
    gate: EnergyGate,
    silence_chunks: u32,
    min_utter_sec: f64,
    max_utter_sec: Option<f64>,
    open: Option<OpenUtterance>,
    silence_run: u32,
}

impl EnergyBoundary {
    /// Creates an energy boundary.
    ///
    /// # Errors
    /// Rejects a negative RMS threshold, a zero silence-chunk threshold, a
    /// negative minimum duration, and a non-positive maximum duration.
    pub fn new(
        rms_threshold: f64,
        silence_chunks: u32,
        min_utter_sec: f64,
        max_utter_sec: Option<f64>,
    ) -> Result<Self> {
        let gate = EnergyGate::new(rms_threshold)?;
        if silence_chunks == 0 {
            return Err(SubvoxError::invalid("silence_chunks", "must be at least 1"));
        }
        if min_utter_sec < 0.0 {
            return Err(SubvoxError::invalid(
                "min_utter_sec",
                format!("must be non-negative, got {min_utter_sec}"),
            ));
        }
        if let Some(max) = max_utter_sec
            && max <= 0.0
        {
            return Err(SubvoxError::invalid(
                "max_utter_sec",
                format!("must be positive, got {max}"),
            ));
        }
        Ok(Self {
            gate,
            silence_chunks,
            min_utter_sec,
            max_utter_sec,
            open: None,
            silence_run: 0,
        })
    }

    fn finalize(&mut self, reason: &'static str) -> Option<AudioChunk> {
        self.silence_run = 0;
        let open = self.open.take()?;
        let utterance =
            AudioChunk::new(open.samples, open.sample_rate, open.channels, open.start);
        if utterance.duration < self.min_utter_sec {
            debug!(
                reason,
                start = utterance.start,
                duration = utterance.duration,
                "utterance below minimum, skipped"
            );
            return None;
        }
        debug!(
            reason,
            start = utterance.start,
            duration = utterance.duration,
            "utterance finalized"
        );
        Some(utterance)
    }
}

impl UtteranceBoundary for EnergyBoundary {
    fn push_chunk(&mut self, chunk: &AudioChunk) -> Vec<AudioChunk> {
        if !self.gate.is_speech(&chunk.samples) {
            if self.open.is_none() {
                return Vec::new();
            }
            self.silence_run += 1;
            if self.silence_run >= self.silence_chunks {
                return self.finalize("silence").into_iter().collect();
            }
            return Vec::new();
        }

        self.silence_run = 0;
        let open = self.open.get_or_insert_with(|| OpenUtterance::begin(chunk));
        open.samples.extend_from_slice(&chunk.samples);
        let duration = open.duration();

        if self.max_utter_sec.is_some_and(|max| duration >= max) {
            return self.finalize("max duration").into_iter().collect();
        }
        Vec::new()
    }

    fn finish(&mut self) -> Option<AudioChunk> {
        self.finalize("stream end")
    }
}

/// Open utterance accumulated by the frame-VAD boundary, mono.
#[derive(Debug)]
struct OpenMonoUtterance {
    samples: Vec<i16>,
    sample_rate: u32,
    start: f64,
    end: f64,
    speech_frames: u32,
    silence_run: u32,
}

/// Frame-granular boundary driven by a [`FrameClassifier`].
///
/// Each chunk is subdivided into fixed VAD frames (a trailing partial frame
/// is dropped). Trailing silence frames are accumulated along with speech so
/// emitted utterances keep their natural decay; an utterance whose speech
/// frame count stays below the minimum is discarded, not emitted.
pub struct FrameVadBoundary {
    vad: FrameVad,
    min_speech_frames: u32,
    end_silence_frames: u32,
    open: Option<OpenMonoUtterance>,
}

impl std::fmt::Debug for FrameVadBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameVadBoundary")
            .field("vad", &self.vad)
            .field("min_speech_frames", &self.min_speech_frames)
            .field("end_silence_frames", &self.end_silence_frames)
            .finish()
    }
}

impl FrameVadBoundary {
    /// Creates a frame-VAD boundary.
    ///
    /// Durations are converted to whole frame counts with a floor of one
    /// frame. Sample rate and frame duration are validated by [`FrameVad`].
    pub fn new(
        classifier: Box<dyn FrameClassifier>,
        sample_rate: u32,
        frame_ms: u32,
        min_speech_ms: u32,
        end_silence_ms: u32,
    ) -> Result<Self> {
        let vad = FrameVad::new(sample_rate, frame_ms, classifier)?;
        let min_speech_frames = (min_speech_ms / frame_ms).max(1);
        let end_silence_frames = (end_silence_ms / frame_ms).max(1);
        Ok(Self {
            vad,
            min_speech_frames,
            end_silence_frames,
            open: None,
        })
    }

    /// Speech frames required before an utterance is worth emitting.
    pub fn min_speech_frames(&self) -> u32 {
        self.min_speech_frames
    }

    /// Consecutive silence frames that close an utterance.
    pub fn end_silence_frames(&self) -> u32 {
        self.end_silence_frames
    }

    fn finalize(&mut self, reason: &'static str) -> Option<AudioChunk> {
        let open = self.open.take()?;
        if open.speech_frames < self.min_speech_frames {
            debug!(
                reason,
                start = open.start,
                speech_frames = open.speech_frames,
                "utterance too short, discarded"
            );
            return None;
        }
        let duration = (open.end - open.start).max(0.0);
        let utterance =
            AudioChunk::with_duration(open.samples, open.sample_rate, 1, open.start, duration);
        debug!(
            reason,
            start = utterance.start,
            duration = utterance.duration,
            "utterance finalized"
        );
        Some(utterance)
    }
}

impl UtteranceBoundary for FrameVadBoundary {
    fn push_chunk(&mut self, chunk: &AudioChunk) -> Vec<AudioChunk> {
        let mono_per_frame = self.vad.frame_samples();
        let interleaved_per_frame = mono_per_frame * chunk.channels.max(1) as usize;
        let frame_sec = self.vad.frame_ms() as f64 / 1000.0;

        let mut finalized = Vec::new();
        let mut offset = 0usize;
        let mut index = 0usize;
        while offset + interleaved_per_frame <= chunk.samples.len() {
            let frame = &chunk.samples[offset..offset + interleaved_per_frame];
            let frame_t0 = chunk.start + index as f64 * frame_sec;
            let speech = self.vad.is_speech(frame, chunk.channels);

            let mut close = false;
            match (&mut self.open, speech) {
                (None, false) => {}
                (None, true) => {
                    self.open = Some(OpenMonoUtterance {
                        samples: first_channel(frame, chunk.channels),
                        sample_rate: chunk.sample_rate,
                        start: frame_t0,
                        end: frame_t0 + frame_sec,
                        speech_frames: 1,
                        silence_run: 0,
                    });
                }
                (Some(open), true) => {
                    open.samples.extend(first_channel(frame, chunk.channels));
                    open.speech_frames += 1;
                    open.silence_run = 0;
                    open.end = frame_t0 + frame_sec;
                }
                (Some(open), false) => {
                    // Silence is retained so the utterance keeps its tail.
                    open.samples.extend(first_channel(frame, chunk.channels));
                    open.silence_run += 1;
                    open.end = frame_t0 + frame_sec;
                    close = open.silence_run >= self.end_silence_frames;
                }
            }

            if close && let Some(utterance) = self.finalize("silence") {
                finalized.push(utterance);
            }

            offset += interleaved_per_frame;
            index += 1;
        }

        finalized
    }

    fn finish(&mut self) -> Option<AudioChunk> {
        self.finalize("stream end")
    }
}
