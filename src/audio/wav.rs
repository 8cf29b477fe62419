//! WAV file audio source for replay mode.

use crate::audio::chunk::AudioChunk;
use crate::audio::source::AudioSource;
use crate::error::{Result, SubvoxError};
use std::io::Read;
use std::path::Path;

/// Audio source that replays WAV file data through the live pipeline.
///
/// Keeps the file's native sample rate and channel layout; chunks carry the
/// real format so downstream stages see exactly what a device would produce.
/// Stream offsets are derived from the running frame count.
#[derive(Debug)]
pub struct WavAudioSource {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    chunk_samples: usize,
    frames_seen: u64,
    position: usize,
}

impl WavAudioSource {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>, chunk_sec: f64) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader).map_err(|e| SubvoxError::Capture {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        let samples: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SubvoxError::Capture {
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        if chunk_sec <= 0.0 {
            return Err(SubvoxError::invalid(
                "chunk_sec",
                format!("must be positive, got {}", chunk_sec),
            ));
        }

        let frames_per_chunk = (spec.sample_rate as f64 * chunk_sec).round().max(1.0) as usize;
        let chunk_samples = frames_per_chunk * spec.channels as usize;

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            chunk_samples,
            frames_seen: 0,
            position: 0,
        })
    }

    /// Open a WAV file from disk.
    pub fn open(path: &Path, chunk_sec: f64) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| SubvoxError::Capture {
            message: format!("Failed to open WAV file {}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)), chunk_sec)
    }

    /// The file's native sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The file's native channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<AudioChunk>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }

        let end = std::cmp::min(self.position + self.chunk_samples, self.samples.len());
        let samples = self.samples[self.position..end].to_vec();
        self.position = end;

        let start = self.frames_seen as f64 / self.sample_rate as f64;
        self.frames_seen += (samples.len() / self.channels as usize) as u64;

        Ok(Some(AudioChunk::new(
            samples,
            self.sample_rate,
            self.channels,
            start,
        )))
    }
}
