//! Lifecycle events emitted by a running pipeline.

use std::fmt;

/// Why the pipeline thread exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The audio source reached end of stream.
    StreamEnded,
    /// Shutdown was requested through the handle.
    Requested,
    /// The capture thread gave up after repeated device failures.
    CaptureFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::StreamEnded => write!(f, "stream ended"),
            StopReason::Requested => write!(f, "stop requested"),
            StopReason::CaptureFailed(message) => write!(f, "capture failed: {message}"),
        }
    }
}

/// Status updates delivered on the optional event channel.
///
/// Sending never blocks; when the receiver lags, events are dropped, since
/// every event is advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Capture and processing threads are live; nothing recognized yet.
    Listening,
    /// The pipeline thread exited.
    WorkerStopped { reason: StopReason },
}
