use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use subvox::audio::{AudioSource, EnergyClassifier, EnergyGate, WavAudioSource};
use subvox::cli::{Cli, Commands, ConfigAction};
use subvox::config::{BoundaryMode, Config};
use subvox::display::{DisplayLine, DisplayWindow, drain_into, format_line};
use subvox::pipeline::{
    EnergyBoundary, FrameVadBoundary, Pipeline, PipelineEvent, UtteranceBoundary,
};
use subvox::stt::WhisperTranscriber;
use subvox::translate::StubTranslator;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match &cli.command {
        None => run_pipeline(&cli)?,
        #[cfg(feature = "cpal-audio")]
        Some(Commands::Devices) => list_audio_devices()?,
        Some(Commands::Config { action }) => handle_config_command(action, cli.config.as_deref())?,
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "subvox", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Route log output to stderr so stdout carries only subtitle lines.
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn init_logging(quiet: bool, verbose: u8) {
    let default_filter = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration and apply overrides.
///
/// Priority order, lowest first:
/// 1. Built-in defaults
/// 2. Config file (--config path, or the default location when present)
/// 3. SUBVOX_* environment variables
/// 4. Command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(path) = cli.config.as_deref() {
        Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path()?)?
    };

    let config = cli.merged_config(config.with_env_overrides()).resolved();
    config.validate()?;
    Ok(config)
}

/// Run the capture-to-subtitle pipeline until the stream ends or an
/// interrupt arrives.
fn run_pipeline(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let source = build_source(cli, &config)?;
    let boundary = build_boundary(&config)?;
    let transcriber = Arc::new(WhisperTranscriber::new(config.whisper_config())?);
    let translator = Arc::new(StubTranslator::new());

    let (event_tx, event_rx) = crossbeam_channel::bounded(16);
    let handle = Pipeline::new(config.pipeline_config())
        .with_event_sender(event_tx)
        .start(source, boundary, transcriber, translator)?;

    let interrupted = install_signal_handler()?;

    let bus = handle.bus();
    let mut window = DisplayWindow::new(config.display.max_lines);
    let poll = Duration::from_millis(config.display.poll_ms);
    let mut stopped = false;

    while !stopped && !interrupted.load(Ordering::SeqCst) {
        for line in drain_into(&bus, &mut window, config.display.max_updates_per_tick) {
            render_line(&line, config.display.show_source, cli.json);
        }

        while let Ok(event) = event_rx.try_recv() {
            match event {
                PipelineEvent::Listening => {
                    if !cli.quiet {
                        eprintln!("Listening... (Ctrl+C to stop)");
                    }
                }
                PipelineEvent::WorkerStopped { .. } => stopped = true,
            }
        }

        std::thread::sleep(poll);
    }

    // Natural end of stream: let queued translations land before the worker
    // is torn down. Bounded so a stalled translator cannot block exit.
    if stopped && !interrupted.load(Ordering::SeqCst) {
        let grace = Instant::now();
        while grace.elapsed() < Duration::from_secs(2) && !interrupted.load(Ordering::SeqCst) {
            let summary = handle.summary();
            if summary.translated_commits + summary.queue_drops >= summary.source_commits {
                break;
            }
            std::thread::sleep(poll);
            for line in drain_into(&bus, &mut window, config.display.max_updates_per_tick) {
                render_line(&line, config.display.show_source, cli.json);
            }
        }
    }

    let summary = handle.stop();

    // Lines flushed during shutdown still need to reach the screen.
    loop {
        let tail = drain_into(&bus, &mut window, config.display.max_updates_per_tick);
        if tail.is_empty() {
            break;
        }
        for line in tail {
            render_line(&line, config.display.show_source, cli.json);
        }
    }

    info!(%summary, "run complete");
    Ok(())
}

/// Pick the audio source: a WAV replay when `--input` is given, the
/// microphone otherwise.
fn build_source(cli: &Cli, config: &Config) -> Result<Box<dyn AudioSource>> {
    if let Some(path) = cli.input.as_deref() {
        return Ok(Box::new(WavAudioSource::open(path, config.audio.chunk_sec)?));
    }

    #[cfg(feature = "cpal-audio")]
    {
        return Ok(Box::new(subvox::audio::CpalAudioSource::new(
            config.audio.device.as_deref(),
            config.audio.sample_rate,
            config.audio.channels,
            config.audio.chunk_sec,
        )?));
    }

    #[cfg(not(feature = "cpal-audio"))]
    {
        anyhow::bail!("built without microphone capture; pass --input to replay a WAV file");
    }
}

/// Build the configured utterance boundary strategy.
fn build_boundary(config: &Config) -> Result<Box<dyn UtteranceBoundary>> {
    let boundary = &config.boundary;
    let strategy: Box<dyn UtteranceBoundary> = match boundary.mode {
        BoundaryMode::Energy => Box::new(EnergyBoundary::new(
            boundary.rms_threshold,
            boundary.silence_chunks,
            boundary.min_utter_sec,
            boundary.max_utter_sec,
        )?),
        BoundaryMode::FrameVad => Box::new(FrameVadBoundary::new(
            Box::new(EnergyClassifier::new(EnergyGate::new(boundary.rms_threshold)?)),
            config.audio.sample_rate,
            boundary.frame_ms,
            boundary.min_speech_ms,
            boundary.end_silence_ms,
        )?),
    };
    Ok(strategy)
}

/// Print one subtitle line to stdout.
fn render_line(line: &DisplayLine, show_source: bool, json: bool) {
    if json {
        match serde_json::to_string(line) {
            Ok(serialized) => println!("{serialized}"),
            Err(e) => warn!(error = %e, "failed to serialize display line"),
        }
        return;
    }

    println!("{}", format_line(line, show_source));
}

/// Flip a shared flag when SIGINT or SIGTERM arrives.
fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    let handler_flag = Arc::clone(&flag);
    std::thread::spawn(move || {
        for signal in signals.forever() {
            info!(signal, "interrupt received, shutting down");
            handler_flag.store(true, Ordering::SeqCst);
        }
    });

    Ok(flag)
}

/// List available audio input devices.
#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = subvox::audio::list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: &ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = match custom_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };

    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                std::process::exit(1);
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, toml::to_string_pretty(&Config::default())?)?;
            println!("Wrote {}", config_path.display());
        }
    }
    Ok(())
}
