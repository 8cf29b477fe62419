//! The audio source capability and its test double.

use crate::audio::chunk::AudioChunk;
use crate::error::{Result, SubvoxError};
use std::collections::VecDeque;

/// Trait for chunked audio sources.
///
/// This trait allows swapping implementations (microphone vs WAV replay vs
/// mock). `read_chunk` blocks until a chunk is available and returns `None`
/// once the stream is exhausted; live sources never return `None` on their
/// own.
pub trait AudioSource: Send {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio from the source.
    fn stop(&mut self) -> Result<()>;

    /// Read the next chunk, blocking until one is available.
    ///
    /// # Returns
    /// `Some(chunk)` while the stream is live, `None` at stream end, or a
    /// capture error if the underlying device fails.
    fn read_chunk(&mut self) -> Result<Option<AudioChunk>>;
}

/// Mock audio source for testing.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    chunks: VecDeque<AudioChunk>,
    is_started: bool,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a mock that immediately reports stream end.
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            is_started: false,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to yield the given chunks, then stream end.
    pub fn with_chunks(mut self, chunks: Vec<AudioChunk>) -> Self {
        self.chunks = chunks.into();
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on the first read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(SubvoxError::Capture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<AudioChunk>> {
        if self.should_fail_read {
            return Err(SubvoxError::Capture {
                message: self.error_message.clone(),
            });
        }
        Ok(self.chunks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_at(start: f64) -> AudioChunk {
        AudioChunk::new(vec![100i16; 8000], 16000, 1, start)
    }

    #[test]
    fn mock_yields_chunks_then_stream_end() {
        let mut source = MockAudioSource::new().with_chunks(vec![chunk_at(0.0), chunk_at(0.5)]);
        source.start().unwrap();

        let first = source.read_chunk().unwrap().unwrap();
        assert_eq!(first.start, 0.0);
        let second = source.read_chunk().unwrap().unwrap();
        assert_eq!(second.start, 0.5);
        assert!(source.read_chunk().unwrap().is_none());
    }

    #[test]
    fn mock_start_failure_is_a_capture_error() {
        let mut source = MockAudioSource::new()
            .with_start_failure()
            .with_error_message("device busy");
        let err = source.start().unwrap_err();
        assert_eq!(err.to_string(), "Audio capture failed: device busy");
        assert!(!source.is_started());
    }

    #[test]
    fn mock_read_failure_is_a_capture_error() {
        let mut source = MockAudioSource::new().with_chunks(vec![chunk_at(0.0)]).with_read_failure();
        source.start().unwrap();
        assert!(source.read_chunk().is_err());
    }
}
