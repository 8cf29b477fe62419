//! Speech-to-text capability.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{MockTranscriber, RecognizedSegment, UtteranceTranscriber};
pub use whisper::{WhisperConfig, WhisperTranscriber};
