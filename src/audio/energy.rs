//! RMS energy speech gate.
//!
//! The cheapest possible voice-activity signal: root-mean-square energy of a
//! PCM16 buffer compared against a fixed threshold. Good enough to find
//! utterance boundaries in quiet rooms; the frame-level VAD exists for
//! everything else.

use crate::error::{Result, SubvoxError};

/// Root-mean-square energy of a PCM16 buffer in raw sample units.
///
/// Returns 0.0 for an empty buffer. Values range from 0 (digital silence) to
/// 32768 (full-scale square wave); samples are not normalized before the
/// calculation, so thresholds are expressed in the same raw units.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Binary speech/non-speech decision over whole PCM16 buffers.
#[derive(Debug, Clone)]
pub struct EnergyGate {
    threshold: f64,
}

impl EnergyGate {
    /// Creates a gate with the given RMS threshold in raw sample units.
    ///
    /// # Errors
    /// Rejects a negative threshold with a configuration error.
    pub fn new(threshold: f64) -> Result<Self> {
        if threshold < 0.0 {
            return Err(SubvoxError::invalid(
                "rms_threshold",
                format!("must be non-negative, got {}", threshold),
            ));
        }
        Ok(Self { threshold })
    }

    /// Whether the buffer's RMS energy reaches the threshold.
    ///
    /// An empty buffer is never speech, regardless of threshold.
    pub fn is_speech(&self, samples: &[i16]) -> bool {
        if samples.is_empty() {
            return false;
        }
        rms(samples) >= self.threshold
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_empty_buffer_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0i16; 480]), 0.0);
    }

    #[test]
    fn rms_of_constant_amplitude_equals_amplitude() {
        let samples = vec![1000i16; 320];
        assert!((rms(&samples) - 1000.0).abs() < 1e-9);

        let negative = vec![-1000i16; 320];
        assert!((rms(&negative) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn rms_handles_full_scale_negative_without_overflow() {
        let samples = vec![i16::MIN; 16];
        assert!((rms(&samples) - 32768.0).abs() < 1e-9);
    }

    #[test]
    fn gate_rejects_negative_threshold() {
        let err = EnergyGate::new(-1.0).unwrap_err();
        assert!(err.to_string().contains("rms_threshold"));
    }

    #[test]
    fn gate_accepts_zero_threshold() {
        assert!(EnergyGate::new(0.0).is_ok());
    }

    #[test]
    fn silence_below_threshold_is_not_speech() {
        let gate = EnergyGate::new(250.0).unwrap();
        assert!(!gate.is_speech(&vec![10i16; 480]));
    }

    #[test]
    fn loud_buffer_at_or_above_threshold_is_speech() {
        let gate = EnergyGate::new(250.0).unwrap();
        assert!(gate.is_speech(&vec![250i16; 480]));
        assert!(gate.is_speech(&vec![5000i16; 480]));
    }

    #[test]
    fn empty_buffer_is_never_speech() {
        let gate = EnergyGate::new(0.0).unwrap();
        assert!(!gate.is_speech(&[]));
    }
}
