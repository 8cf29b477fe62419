//! Pipeline wiring: capture through boundary detection, transcription,
//! segmentation and translation to the subtitle bus.
//!
//! Three threads at most: a capture thread blocking on the audio source, the
//! pipeline thread running the boundary state machine and segmenter, and an
//! optional translation worker. The two drop-oldest queues are the only
//! cross-thread shared mutable state.

use crate::audio::chunk::AudioChunk;
use crate::audio::energy::rms;
use crate::audio::source::AudioSource;
use crate::bus::DropOldestQueue;
use crate::defaults;
use crate::display::{DisplayLine, SubtitleBus};
use crate::error::Result;
use crate::pipeline::boundary::UtteranceBoundary;
use crate::pipeline::events::{PipelineEvent, StopReason};
use crate::pipeline::metrics::{RunMetrics, RunSummary};
use crate::stt::transcriber::UtteranceTranscriber;
use crate::text::filter::clean_fragment;
use crate::text::segmenter::{SubtitleLine, SubtitleSegmenter};
use crate::translate::{TranslationRequest, Translator};
use crossbeam_channel::{RecvTimeoutError, SendTimeoutError, Sender, bounded};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Run generations, process-wide. A restarted pipeline gets a fresh value so
/// translation jobs from an earlier run are recognizable as stale.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Translate inline on the pipeline thread instead of through the worker.
    pub sync_translate: bool,
    /// Source language code passed to the translator.
    pub source_lang: String,
    /// Target language code passed to the translator.
    pub target_lang: String,
    /// Pause gap in seconds that forces a subtitle commit.
    pub gap_sec: f64,
    /// Hard ceiling on merged subtitle line length in characters.
    pub hard_max_chars: usize,
    /// Translation queue capacity (asynchronous mode).
    pub queue_capacity: usize,
    /// Subtitle bus capacity.
    pub bus_capacity: usize,
    /// Capture-to-pipeline channel capacity.
    pub chunk_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync_translate: false,
            source_lang: defaults::SOURCE_LANG.to_string(),
            target_lang: defaults::TARGET_LANG.to_string(),
            gap_sec: defaults::GAP_SEC,
            hard_max_chars: defaults::HARD_MAX_CHARS,
            queue_capacity: defaults::TRANSLATE_QUEUE_CAPACITY,
            bus_capacity: defaults::SUBTITLE_BUS_CAPACITY,
            chunk_buffer: defaults::CHUNK_BUFFER,
        }
    }
}

/// One queued translation: a committed line's text and span, tagged with the
/// run that produced it so a worker never delivers stale results into a newer
/// run after a rapid restart.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateJob {
    pub generation: u64,
    pub text: String,
    pub t0: f64,
    pub t1: f64,
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    metrics: Arc<RunMetrics>,
    bus: SubtitleBus,
}

impl PipelineHandle {
    /// The subtitle bus this run publishes to; clone per display consumer.
    pub fn bus(&self) -> SubtitleBus {
        self.bus.clone()
    }

    /// Returns true until stop has been requested.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Counter totals so far; final totals come from [`PipelineHandle::stop`].
    pub fn summary(&self) -> RunSummary {
        self.metrics.snapshot()
    }

    /// Stops the pipeline and returns the run's counter totals.
    ///
    /// Waits up to 5s for threads to finish, joining completed ones to
    /// surface panics. After the deadline, remaining threads are detached and
    /// die with the process.
    pub fn stop(mut self) -> RunSummary {
        self.running.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_secs(5);
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    if let Err(panic_info) = handle.join() {
                        let message = panic_info
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| panic_info.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        error!(panic = %message, "pipeline thread panicked");
                    }
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                error!(
                    threads = self.threads.len(),
                    "shutdown deadline passed, detaching remaining threads"
                );
                break;
            }
            thread::sleep(poll_interval);
        }

        self.metrics.snapshot()
    }
}

/// Commits lines downstream: inline translation in sync mode, a pending line
/// plus a queued job in async mode.
struct LineEmitter {
    sync_translate: bool,
    source_lang: String,
    target_lang: String,
    generation: u64,
    translator: Arc<dyn Translator>,
    queue: Option<DropOldestQueue<TranslateJob>>,
    bus: SubtitleBus,
    metrics: Arc<RunMetrics>,
}

impl LineEmitter {
    fn emit(&self, line: SubtitleLine) {
        self.metrics.record_source_commit();
        if self.sync_translate {
            self.emit_sync(line);
        } else {
            self.emit_async(line);
        }
    }

    fn emit_sync(&self, line: SubtitleLine) {
        let request = TranslationRequest::new(
            line.text.as_str(),
            self.source_lang.as_str(),
            self.target_lang.as_str(),
        );
        let started = Instant::now();
        match self.translator.translate(&request) {
            Ok(translated) => {
                self.metrics.record_translation(started.elapsed());
                self.metrics.record_translated_commit();
                self.push_line(DisplayLine::translated(line.text, translated, line.t0, line.t1));
            }
            Err(e) => {
                // The source line still goes on screen.
                warn!(error = %e, "translation failed, keeping source line");
                self.push_line(DisplayLine::pending(line.text, line.t0, line.t1));
            }
        }
    }

    fn emit_async(&self, line: SubtitleLine) {
        self.push_line(DisplayLine::pending(line.text.clone(), line.t0, line.t1));
        if let Some(queue) = &self.queue {
            let dropped = queue.push(TranslateJob {
                generation: self.generation,
                text: line.text,
                t0: line.t0,
                t1: line.t1,
            });
            if dropped {
                self.metrics.record_queue_drop();
                warn!("translation queue full, dropped oldest job");
            }
        }
    }

    fn push_line(&self, line: DisplayLine) {
        if self.bus.push(line) {
            debug!("subtitle bus full, evicted oldest line");
        }
    }
}

fn transcribe_and_emit(
    transcriber: &dyn UtteranceTranscriber,
    utterance: &AudioChunk,
    segmenter: &mut SubtitleSegmenter,
    emitter: &LineEmitter,
) {
    let segments = match transcriber.transcribe_utterance(
        &utterance.samples,
        utterance.sample_rate,
        utterance.channels,
        utterance.start,
    ) {
        Ok(segments) => segments,
        Err(e) => {
            warn!(error = %e, start = utterance.start, "transcription failed, utterance dropped");
            return;
        }
    };

    for segment in segments {
        let Some(clean) = clean_fragment(&segment.text, defaults::MAX_WORD_REPEAT) else {
            continue;
        };
        for line in segmenter.push(&clean, segment.t0, segment.t1) {
            emitter.emit(line);
        }
    }
}

fn emit_event(events: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        let _ = tx.try_send(event);
    }
}

/// Pipeline: AudioSource → boundary → transcriber → filter → segmenter →
/// translation → subtitle bus.
pub struct Pipeline {
    config: PipelineConfig,
    metrics: Arc<RunMetrics>,
    events: Option<Sender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(RunMetrics::new()),
            events: None,
        }
    }

    /// Attaches a channel for lifecycle events. Sends never block; events are
    /// dropped when the receiver lags.
    pub fn with_event_sender(mut self, events: Sender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Starts the pipeline.
    ///
    /// # Arguments
    /// * `source` - Chunked audio capture
    /// * `boundary` - Utterance boundary strategy (energy or frame-VAD)
    /// * `transcriber` - Speech-to-text capability
    /// * `translator` - Translation capability
    ///
    /// # Errors
    /// Fails fast when the source cannot start or a queue capacity is zero;
    /// no threads are spawned in that case.
    pub fn start(
        self,
        mut source: Box<dyn AudioSource>,
        mut boundary: Box<dyn UtteranceBoundary>,
        transcriber: Arc<dyn UtteranceTranscriber>,
        translator: Arc<dyn Translator>,
    ) -> Result<PipelineHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);

        let bus: SubtitleBus = DropOldestQueue::new(self.config.bus_capacity)?;
        let queue = if self.config.sync_translate {
            None
        } else {
            Some(DropOldestQueue::<TranslateJob>::new(
                self.config.queue_capacity,
            )?)
        };

        source.start()?;

        let (chunk_tx, chunk_rx) = bounded::<AudioChunk>(self.config.chunk_buffer);

        // Capture thread: blocks on the device, hands chunks to the pipeline
        // thread. A backlogged pipeline costs captured chunks, not memory.
        let capture_error = Arc::new(Mutex::new(None::<String>));
        let capture_running = running.clone();
        let capture_error_slot = capture_error.clone();
        let capture_handle = thread::spawn(move || {
            const MAX_CONSECUTIVE_ERRORS: u32 = 10;
            let retry_interval = Duration::from_millis(20);
            let send_timeout = Duration::from_millis(500);
            let mut consecutive_errors: u32 = 0;

            while capture_running.load(Ordering::SeqCst) {
                let chunk = match source.read_chunk() {
                    Ok(Some(chunk)) => {
                        consecutive_errors = 0;
                        chunk
                    }
                    Ok(None) => break,
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!(error = %e, "audio capture failed repeatedly, giving up");
                            if let Ok(mut slot) = capture_error_slot.lock() {
                                *slot = Some(e.to_string());
                            }
                            break;
                        }
                        thread::sleep(retry_interval);
                        continue;
                    }
                };

                match chunk_tx.send_timeout(chunk, send_timeout) {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        if !capture_running.load(Ordering::SeqCst) {
                            break;
                        }
                        warn!("pipeline backlogged, dropped one captured chunk");
                    }
                    Err(SendTimeoutError::Disconnected(_)) => break,
                }
            }

            if let Err(e) = source.stop() {
                warn!(error = %e, "failed to stop audio capture");
            }
        });

        // Pipeline thread: boundary state machine, transcription, filtering,
        // segmentation and line commit.
        let emitter = LineEmitter {
            sync_translate: self.config.sync_translate,
            source_lang: self.config.source_lang.clone(),
            target_lang: self.config.target_lang.clone(),
            generation,
            translator: translator.clone(),
            queue: queue.clone(),
            bus: bus.clone(),
            metrics: self.metrics.clone(),
        };
        let mut segmenter = SubtitleSegmenter::new(self.config.gap_sec, self.config.hard_max_chars);
        let pipeline_running = running.clone();
        let pipeline_metrics = self.metrics.clone();
        let events = self.events;
        let pipeline_handle = thread::spawn(move || {
            emit_event(&events, PipelineEvent::Listening);
            info!(
                model = transcriber.model_name(),
                sync = emitter.sync_translate,
                "pipeline listening"
            );

            loop {
                match chunk_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(chunk) => {
                        debug!(rms = rms(&chunk.samples), start = chunk.start, "chunk level");
                        for utterance in boundary.push_chunk(&chunk) {
                            transcribe_and_emit(
                                transcriber.as_ref(),
                                &utterance,
                                &mut segmenter,
                                &emitter,
                            );
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if !pipeline_running.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // Nothing buffered may be silently lost: close the open utterance
            // and flush the segmenter through the normal emit path.
            if let Some(utterance) = boundary.finish() {
                transcribe_and_emit(transcriber.as_ref(), &utterance, &mut segmenter, &emitter);
            }
            if let Some(line) = segmenter.flush() {
                emitter.emit(line);
            }

            let reason = if !pipeline_running.load(Ordering::SeqCst) {
                StopReason::Requested
            } else if let Some(message) = capture_error.lock().ok().and_then(|slot| slot.clone()) {
                StopReason::CaptureFailed(message)
            } else {
                StopReason::StreamEnded
            };
            let summary = pipeline_metrics.snapshot();
            info!(%reason, %summary, "pipeline stopped");
            emit_event(&events, PipelineEvent::WorkerStopped { reason });
        });

        let mut threads = vec![capture_handle, pipeline_handle];

        // Translation worker: drains the job queue until stop. It keeps
        // running after stream end so queued jobs still complete.
        if let Some(queue) = queue {
            let worker_running = running.clone();
            let worker_bus = bus.clone();
            let worker_metrics = self.metrics.clone();
            let source_lang = self.config.source_lang.clone();
            let target_lang = self.config.target_lang.clone();
            threads.push(thread::spawn(move || {
                info!(translator = translator.name(), "translation worker started");
                let poll = Duration::from_millis(defaults::WORKER_POLL_MS);

                while worker_running.load(Ordering::SeqCst) {
                    let Some(job) = queue.pop_timeout(poll) else {
                        continue;
                    };
                    if job.generation != generation {
                        debug!(job_generation = job.generation, "stale translation job skipped");
                        continue;
                    }

                    let request = TranslationRequest::new(
                        job.text.as_str(),
                        source_lang.as_str(),
                        target_lang.as_str(),
                    );
                    let started = Instant::now();
                    match translator.translate(&request) {
                        Ok(translated) => {
                            worker_metrics.record_translation(started.elapsed());
                            if !worker_running.load(Ordering::SeqCst) {
                                debug!("discarding translation completed after stop");
                                break;
                            }
                            let line =
                                DisplayLine::translated(job.text, translated, job.t0, job.t1);
                            if worker_bus.push(line) {
                                debug!("subtitle bus full, evicted oldest line");
                            }
                            worker_metrics.record_translated_commit();
                        }
                        Err(e) => warn!(error = %e, "translation failed, job dropped"),
                    }
                }

                info!("translation worker stopped");
            }));
        }

        Ok(PipelineHandle {
            running,
            threads,
            metrics: self.metrics,
            bus,
        })
    }
}
