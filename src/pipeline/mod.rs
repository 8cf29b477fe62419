//! Capture-to-subtitle pipeline.
//!
//! The orchestrator wires capture, boundary detection, transcription,
//! segmentation and translation into a handful of threads connected by
//! bounded channels; boundary strategies, lifecycle events and run counters
//! live in their own modules.

pub mod boundary;
pub mod events;
pub mod metrics;
pub mod orchestrator;

pub use boundary::{EnergyBoundary, FrameVadBoundary, UtteranceBoundary};
pub use events::{PipelineEvent, StopReason};
pub use metrics::{RunMetrics, RunSummary};
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle, TranslateJob};
