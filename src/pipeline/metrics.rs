//! Per-run pipeline counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared counters updated by the pipeline and translation threads.
///
/// Counters are monotonic within one run; relaxed ordering is enough because
/// nothing synchronizes through them.
#[derive(Debug, Default)]
pub struct RunMetrics {
    source_commits: AtomicU64,
    translated_commits: AtomicU64,
    queue_drops: AtomicU64,
    translate_samples: AtomicU64,
    translate_total_ms: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_source_commit(&self) {
        self.source_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated_commit(&self) {
        self.translated_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_drop(&self) {
        self.queue_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed translation call and its latency.
    pub fn record_translation(&self, latency: Duration) {
        self.translate_samples.fetch_add(1, Ordering::Relaxed);
        self.translate_total_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            source_commits: self.source_commits.load(Ordering::Relaxed),
            translated_commits: self.translated_commits.load(Ordering::Relaxed),
            queue_drops: self.queue_drops.load(Ordering::Relaxed),
            translate_samples: self.translate_samples.load(Ordering::Relaxed),
            translate_total_ms: self.translate_total_ms.load(Ordering::Relaxed),
        }
    }
}

/// Counter totals for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Committed source subtitle lines.
    pub source_commits: u64,
    /// Lines that received a translation, inline or from the worker.
    pub translated_commits: u64,
    /// Jobs evicted from the translation queue under backpressure.
    pub queue_drops: u64,
    /// Completed translation calls.
    pub translate_samples: u64,
    /// Total wall time spent inside the translator, in milliseconds.
    pub translate_total_ms: u64,
}

impl RunSummary {
    /// Mean translation latency in milliseconds, `None` before the first
    /// sample.
    pub fn avg_translate_ms(&self) -> Option<f64> {
        if self.translate_samples == 0 {
            None
        } else {
            Some(self.translate_total_ms as f64 / self.translate_samples as f64)
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines, {} translated, {} queue drops",
            self.source_commits, self.translated_commits, self.queue_drops
        )?;
        if let Some(avg) = self.avg_translate_ms() {
            write!(f, ", avg translation {avg:.1} ms")?;
        }
        Ok(())
    }
}
