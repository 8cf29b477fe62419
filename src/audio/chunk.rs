//! The audio value type passed between capture and the boundary detectors.

/// A fixed slice of captured audio.
///
/// Samples are interleaved 16-bit PCM. `start` is the offset in seconds from
/// the beginning of the stream, derived from the running frame count rather
/// than wall-clock time so replayed files and live capture behave identically.
/// Chunks are never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Interleaved PCM samples (16-bit signed integers).
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Offset of the first sample, in seconds since stream start.
    pub start: f64,
    /// Duration covered by the samples, in seconds.
    pub duration: f64,
}

impl AudioChunk {
    /// Creates a chunk, deriving the duration from the sample count.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16, start: f64) -> Self {
        let duration = duration_of(samples.len(), sample_rate, channels);
        Self {
            samples,
            sample_rate,
            channels,
            start,
            duration,
        }
    }

    /// Creates a chunk with an explicit duration.
    ///
    /// Used when the interval is defined by utterance frame timestamps
    /// rather than derived from the raw sample count.
    pub fn with_duration(
        samples: Vec<i16>,
        sample_rate: u32,
        channels: u16,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            start,
            duration,
        }
    }

    /// Offset of the end of the chunk in seconds since stream start.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Number of per-channel sample frames in the chunk.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Duration in seconds of `len` interleaved samples.
pub fn duration_of(len: usize, sample_rate: u32, channels: u16) -> f64 {
    if sample_rate == 0 || channels == 0 {
        return 0.0;
    }
    len as f64 / (sample_rate as f64 * channels as f64)
}
