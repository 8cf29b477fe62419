//! Audio capture and voice-activity primitives.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod chunk;
pub mod energy;
pub mod frame_vad;
pub mod source;
pub mod wav;

pub use chunk::AudioChunk;
pub use energy::{EnergyGate, rms};
pub use frame_vad::{EnergyClassifier, FrameClassifier, FrameVad, ScriptedClassifier};
pub use source::{AudioSource, MockAudioSource};
pub use wav::WavAudioSource;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalAudioSource, list_devices};
