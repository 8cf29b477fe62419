//! The utterance transcription capability and its test double.

use crate::error::{Result, SubvoxError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A span of recognized text inside one utterance.
///
/// Timestamps are global stream offsets: the transcription capability adds
/// the utterance's start time to each engine-relative offset before
/// returning.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSegment {
    pub text: String,
    /// Start of the span in seconds since stream start.
    pub t0: f64,
    /// End of the span in seconds since stream start.
    pub t1: f64,
    /// Whether the engine considers this span final (vs. a partial guess).
    pub is_final: bool,
}

impl RecognizedSegment {
    pub fn new(text: impl Into<String>, t0: f64, t1: f64) -> Self {
        Self {
            text: text.into(),
            t0,
            t1,
            is_final: true,
        }
    }
}

/// Trait for utterance-level speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait UtteranceTranscriber: Send + Sync {
    /// Transcribe one finalized utterance.
    ///
    /// # Arguments
    /// * `samples` - Interleaved 16-bit PCM for the whole utterance
    /// * `sample_rate` - Sample rate of the buffer in Hz
    /// * `channels` - Interleaved channel count
    /// * `utter_t0` - The utterance's start offset in seconds since stream start
    ///
    /// # Returns
    /// Zero or more segments with global timestamps; segments whose text is
    /// empty after trimming must be omitted.
    fn transcribe_utterance(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        utter_t0: f64,
    ) -> Result<Vec<RecognizedSegment>>;

    /// Name of the loaded model, for logs.
    fn model_name(&self) -> &str;
}

/// Implement the trait for Arc<T> to allow sharing across threads.
impl<T: UtteranceTranscriber> UtteranceTranscriber for Arc<T> {
    fn transcribe_utterance(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
        utter_t0: f64,
    ) -> Result<Vec<RecognizedSegment>> {
        (**self).transcribe_utterance(samples, sample_rate, channels, utter_t0)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// A scripted segment: text plus offsets relative to the utterance start.
#[derive(Debug, Clone)]
struct ScriptedSegment {
    text: String,
    rel_t0: f64,
    rel_t1: f64,
}

/// Mock transcriber for testing.
///
/// Yields one scripted response per transcribed utterance, in order. Each
/// scripted segment's offsets are relative to the utterance start, mirroring
/// how a real engine reports them.
pub struct MockTranscriber {
    model_name: String,
    script: Mutex<VecDeque<Vec<ScriptedSegment>>>,
    calls: Mutex<Vec<f64>>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a mock that returns no segments for every utterance.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    /// Queue a response for the next utterance: `(relative t0, relative t1, text)`.
    pub fn with_utterance(self, segments: &[(f64, f64, &str)]) -> Self {
        let scripted = segments
            .iter()
            .map(|(rel_t0, rel_t1, text)| ScriptedSegment {
                text: (*text).to_string(),
                rel_t0: *rel_t0,
                rel_t1: *rel_t1,
            })
            .collect();
        if let Ok(mut script) = self.script.lock() {
            script.push_back(scripted);
        }
        self
    }

    /// Configure the mock to fail on every call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Start times of every utterance handed to the mock so far.
    pub fn utterance_starts(&self) -> Vec<f64> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl UtteranceTranscriber for MockTranscriber {
    fn transcribe_utterance(
        &self,
        _samples: &[i16],
        _sample_rate: u32,
        _channels: u16,
        utter_t0: f64,
    ) -> Result<Vec<RecognizedSegment>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(utter_t0);
        }
        if self.should_fail {
            return Err(SubvoxError::Transcription {
                message: "mock transcription failure".to_string(),
            });
        }

        let scripted = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_default();

        Ok(scripted
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| RecognizedSegment::new(s.text, utter_t0 + s.rel_t0, utter_t0 + s.rel_t1))
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
