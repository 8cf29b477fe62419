//! Frame-level voice activity detection.
//!
//! Classifies short fixed-duration frames instead of whole chunks, which
//! resolves utterance boundaries much finer than the energy gate. The actual
//! classification algorithm is supplied from outside through the
//! [`FrameClassifier`] trait; this module owns frame sizing, parameter
//! validation and channel down-mixing.

use crate::audio::energy::EnergyGate;
use crate::defaults::{ALLOWED_FRAME_MS, ALLOWED_VAD_RATES};
use crate::error::{Result, SubvoxError};
use std::collections::VecDeque;

/// Classifies a mono PCM16 frame as speech or silence.
///
/// Implementations may keep internal state across calls, so classification
/// takes `&mut self`.
pub trait FrameClassifier: Send {
    /// Whether the mono frame contains speech. The frame length is always
    /// `sample_rate * frame_ms / 1000` samples for the configured frame
    /// duration.
    fn is_speech(&mut self, frame: &[i16], sample_rate: u32) -> bool;
}

/// Frame classifier backed by the RMS energy gate.
///
/// The fallback classifier when no dedicated VAD engine is wired in.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    gate: EnergyGate,
}

impl EnergyClassifier {
    pub fn new(gate: EnergyGate) -> Self {
        Self { gate }
    }
}

impl FrameClassifier for EnergyClassifier {
    fn is_speech(&mut self, frame: &[i16], _sample_rate: u32) -> bool {
        self.gate.is_speech(frame)
    }
}

/// Scripted classifier for tests: returns a queued decision per call, then
/// silence once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    decisions: VecDeque<bool>,
}

impl ScriptedClassifier {
    pub fn new(decisions: Vec<bool>) -> Self {
        Self {
            decisions: decisions.into(),
        }
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn is_speech(&mut self, _frame: &[i16], _sample_rate: u32) -> bool {
        self.decisions.pop_front().unwrap_or(false)
    }
}

/// Frame-level VAD with validated parameters and first-channel down-mixing.
pub struct FrameVad {
    sample_rate: u32,
    frame_ms: u32,
    classifier: Box<dyn FrameClassifier>,
}

impl std::fmt::Debug for FrameVad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameVad")
            .field("sample_rate", &self.sample_rate)
            .field("frame_ms", &self.frame_ms)
            .finish()
    }
}

impl FrameVad {
    /// Creates a frame VAD.
    ///
    /// # Errors
    /// The sample rate must be one of 8000, 16000, 32000 or 48000 Hz and the
    /// frame duration one of 10, 20 or 30 ms; anything else is rejected.
    pub fn new(sample_rate: u32, frame_ms: u32, classifier: Box<dyn FrameClassifier>) -> Result<Self> {
        if !ALLOWED_VAD_RATES.contains(&sample_rate) {
            return Err(SubvoxError::invalid(
                "sample_rate",
                format!(
                    "frame VAD supports {:?} Hz, got {}",
                    ALLOWED_VAD_RATES, sample_rate
                ),
            ));
        }
        if !ALLOWED_FRAME_MS.contains(&frame_ms) {
            return Err(SubvoxError::invalid(
                "frame_ms",
                format!("frame VAD supports {:?} ms, got {}", ALLOWED_FRAME_MS, frame_ms),
            ));
        }
        Ok(Self {
            sample_rate,
            frame_ms,
            classifier,
        })
    }

    /// Frame length in mono samples: sample_rate × frame_ms / 1000.
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as usize * self.frame_ms as usize) / 1000
    }

    /// Classifies one frame of interleaved samples.
    ///
    /// Multi-channel input is down-mixed by keeping only the first channel;
    /// averaging channels would smear transients the classifier keys on.
    pub fn is_speech(&mut self, frame: &[i16], channels: u16) -> bool {
        if channels <= 1 {
            return self.classifier.is_speech(frame, self.sample_rate);
        }
        let mono = first_channel(frame, channels);
        self.classifier.is_speech(&mono, self.sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_ms(&self) -> u32 {
        self.frame_ms
    }
}

/// Extracts the first channel from interleaved samples.
pub fn first_channel(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .step_by(channels as usize)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy_vad(sample_rate: u32, frame_ms: u32) -> Result<FrameVad> {
        let gate = EnergyGate::new(250.0)?;
        FrameVad::new(sample_rate, frame_ms, Box::new(EnergyClassifier::new(gate)))
    }

    #[test]
    fn accepts_all_supported_rates_and_durations() {
        for rate in ALLOWED_VAD_RATES {
            for ms in ALLOWED_FRAME_MS {
                assert!(energy_vad(rate, ms).is_ok(), "rate={} ms={}", rate, ms);
            }
        }
    }

    #[test]
    fn rejects_unsupported_sample_rate() {
        let err = energy_vad(44100, 20).unwrap_err();
        assert!(err.to_string().contains("sample_rate"));
    }

    #[test]
    fn rejects_unsupported_frame_duration() {
        let err = energy_vad(16000, 25).unwrap_err();
        assert!(err.to_string().contains("frame_ms"));
    }

    #[test]
    fn frame_samples_scale_with_rate_and_duration() {
        assert_eq!(energy_vad(16000, 20).unwrap().frame_samples(), 320);
        assert_eq!(energy_vad(8000, 10).unwrap().frame_samples(), 80);
        assert_eq!(energy_vad(48000, 30).unwrap().frame_samples(), 1440);
    }

    #[test]
    fn first_channel_keeps_every_nth_sample() {
        let stereo = vec![1i16, -1, 2, -2, 3, -3];
        assert_eq!(first_channel(&stereo, 2), vec![1, 2, 3]);

        let mono = vec![5i16, 6, 7];
        assert_eq!(first_channel(&mono, 1), vec![5, 6, 7]);
    }

    #[test]
    fn stereo_classification_ignores_second_channel() {
        // Loud left channel, silent right channel: the first-channel downmix
        // must classify as speech.
        let mut frame = Vec::new();
        for _ in 0..320 {
            frame.push(5000i16);
            frame.push(0i16);
        }
        let mut vad = energy_vad(16000, 20).unwrap();
        assert!(vad.is_speech(&frame, 2));

        // Silent left, loud right: not speech.
        let mut swapped = Vec::new();
        for _ in 0..320 {
            swapped.push(0i16);
            swapped.push(5000i16);
        }
        assert!(!vad.is_speech(&swapped, 2));
    }

    #[test]
    fn scripted_classifier_pops_decisions_in_order() {
        let mut vad = FrameVad::new(
            16000,
            20,
            Box::new(ScriptedClassifier::new(vec![true, false, true])),
        )
        .unwrap();
        let frame = vec![0i16; 320];
        assert!(vad.is_speech(&frame, 1));
        assert!(!vad.is_speech(&frame, 1));
        assert!(vad.is_speech(&frame, 1));
        // Script exhausted, fallback is false.
        assert!(!vad.is_speech(&frame, 1));
    }
}
