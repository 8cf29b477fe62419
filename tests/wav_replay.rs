//! Replays generated WAV fixtures through the full pipeline and checks
//! that subtitle timestamps line up with stream offsets.

use std::sync::Arc;
use std::time::{Duration, Instant};

use subvox::audio::WavAudioSource;
use subvox::display::{DisplayLine, SubtitleBus};
use subvox::pipeline::{EnergyBoundary, Pipeline, PipelineConfig, UtteranceBoundary};
use subvox::stt::MockTranscriber;
use subvox::translate::MockTranslator;
use tempfile::NamedTempFile;

/// Writes a 16-bit PCM WAV of consecutive runs, each `(frames, amplitude)`.
fn write_wav(sample_rate: u32, channels: u16, runs: &[(usize, i16)]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(file.path(), spec).expect("create wav");
    for &(frames, amplitude) in runs {
        for _ in 0..frames * channels as usize {
            writer.write_sample(amplitude).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
    file
}

fn boundary() -> Box<dyn UtteranceBoundary> {
    Box::new(EnergyBoundary::new(250.0, 2, 0.1, None).expect("valid boundary"))
}

fn sync_config() -> PipelineConfig {
    PipelineConfig {
        sync_translate: true,
        ..PipelineConfig::default()
    }
}

fn wait_for(bus: &SubtitleBus, want: usize) -> Vec<DisplayLine> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut lines = Vec::new();
    while lines.len() < want && Instant::now() < deadline {
        match bus.pop() {
            Some(line) => lines.push(line),
            None => std::thread::sleep(Duration::from_millis(5)),
        }
    }
    lines
}

#[test]
fn replay_yields_subtitles_at_stream_offsets() {
    // 0.5 s of silence, 1 s of tone, 1 s of silence.
    let wav = write_wav(16000, 1, &[(8000, 0), (16000, 3000), (16000, 0)]);
    let source = WavAudioSource::open(wav.path(), 0.5).expect("open wav");
    let transcriber = Arc::new(
        MockTranscriber::new("mock-base").with_utterance(&[(0.0, 1.0, "replayed speech.")]),
    );

    let handle = Pipeline::new(sync_config())
        .start(
            Box::new(source),
            boundary(),
            transcriber.clone(),
            Arc::new(MockTranslator::new()),
        )
        .expect("pipeline starts");

    let bus = handle.bus();
    let lines = wait_for(&bus, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "replayed speech.");
    assert_eq!(lines[0].translated, "mock:replayed speech.");
    assert!((lines[0].t0 - 0.5).abs() < 1e-9);
    assert!((lines[0].t1 - 1.5).abs() < 1e-9);

    let starts = transcriber.utterance_starts();
    assert_eq!(starts.len(), 1);
    assert!((starts[0] - 0.5).abs() < 1e-9);

    let summary = handle.stop();
    assert_eq!(summary.source_commits, 1);
}

#[test]
fn replay_flushes_trailing_speech_at_stream_end() {
    // The file ends while the speaker is still mid-sentence.
    let wav = write_wav(16000, 1, &[(8000, 0), (16000, 3000)]);
    let source = WavAudioSource::open(wav.path(), 0.5).expect("open wav");
    let transcriber = Arc::new(
        MockTranscriber::new("mock-base").with_utterance(&[(0.0, 1.0, "unfinished thought")]),
    );

    let handle = Pipeline::new(sync_config())
        .start(
            Box::new(source),
            boundary(),
            transcriber,
            Arc::new(MockTranslator::new()),
        )
        .expect("pipeline starts");

    let bus = handle.bus();
    let lines = wait_for(&bus, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "unfinished thought");
    assert_eq!(lines[0].translated, "mock:unfinished thought");

    handle.stop();
}

#[test]
fn stereo_replay_keeps_frame_accurate_offsets() {
    // Stereo at 8 kHz: offsets must count frames, not interleaved samples.
    let wav = write_wav(8000, 2, &[(4000, 0), (8000, 3000), (8000, 0)]);
    let source = WavAudioSource::open(wav.path(), 0.5).expect("open wav");
    assert_eq!(source.sample_rate(), 8000);
    assert_eq!(source.channels(), 2);

    let transcriber = Arc::new(
        MockTranscriber::new("mock-base").with_utterance(&[(0.0, 1.0, "both channels.")]),
    );

    let handle = Pipeline::new(sync_config())
        .start(
            Box::new(source),
            boundary(),
            transcriber.clone(),
            Arc::new(MockTranslator::new()),
        )
        .expect("pipeline starts");

    let bus = handle.bus();
    let lines = wait_for(&bus, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "both channels.");
    assert!((lines[0].t0 - 0.5).abs() < 1e-9);

    let starts = transcriber.utterance_starts();
    assert_eq!(starts.len(), 1);
    assert!((starts[0] - 0.5).abs() < 1e-9);

    handle.stop();
}
