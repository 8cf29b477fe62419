//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::chunk::AudioChunk;
use crate::audio::source::AudioSource;
use crate::error::{Result, SubvoxError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List the names of all available audio input devices.
///
/// # Errors
/// Returns `Capture` if device enumeration fails.
///
/// # Note
/// During enumeration, cpal may probe several backends (ALSA, JACK, Pulse);
/// the warnings those probes produce are suppressed.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| SubvoxError::Capture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only accessed from a single thread at a time through
/// the Mutex wrapper in CpalAudioSource. The stream methods are called
/// synchronously and don't cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture implementation using CPAL.
///
/// Requests the configured format directly (i16 first, f32 with conversion as
/// a fallback) and hands out fixed-duration chunks whose start offsets come
/// from the running frame count, so timestamps match what a file replay of
/// the same audio would produce.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Mutex<Option<SendableStream>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    stopped: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
    chunk_samples: usize,
    frames_seen: u64,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default input device.
    /// * `sample_rate` - Capture rate in Hz.
    /// * `channels` - Interleaved channel count to request.
    /// * `chunk_sec` - Duration of each emitted chunk in seconds.
    ///
    /// # Errors
    /// Returns `AudioDeviceNotFound` when no matching input device exists and
    /// `Capture` when enumeration fails.
    pub fn new(
        device_name: Option<&str>,
        sample_rate: u32,
        channels: u16,
        chunk_sec: f64,
    ) -> Result<Self> {
        if chunk_sec <= 0.0 {
            return Err(SubvoxError::invalid(
                "chunk_sec",
                format!("must be positive, got {}", chunk_sec),
            ));
        }

        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host.input_devices().map_err(|e| SubvoxError::Capture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;

                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        return Ok(dev);
                    }
                }

                Err(SubvoxError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                host.default_input_device()
                    .ok_or_else(|| SubvoxError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    })
            }
        })?;

        let frames_per_chunk = (sample_rate as f64 * chunk_sec).round().max(1.0) as usize;

        Ok(Self {
            device,
            stream: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
            stopped: Arc::new(AtomicBool::new(false)),
            sample_rate,
            channels,
            chunk_samples: frames_per_chunk * channels as usize,
            frames_seen: 0,
        })
    }

    /// Build the input stream in the requested format.
    ///
    /// Tries i16 first (zero-copy path), then f32 with sample conversion for
    /// devices that only expose float formats.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            tracing::warn!(error = %err, "audio stream error");
        };

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| SubvoxError::Capture {
                message: format!("Failed to build input stream: {}", e),
            })
    }

    fn take_buffered(&self, min_samples: usize) -> Option<Vec<i16>> {
        let mut buf = self.buffer.lock().ok()?;
        if buf.len() < min_samples {
            return None;
        }
        Some(buf.drain(..min_samples).collect())
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let stream = with_suppressed_stderr(|| self.build_stream())?;
        stream.play().map_err(|e| SubvoxError::Capture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        self.stopped.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.stream.lock() {
            *slot = Some(SendableStream(stream));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.stream.lock() {
            // Dropping the stream stops the callbacks.
            slot.take();
        }
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<AudioChunk>> {
        loop {
            if let Some(samples) = self.take_buffered(self.chunk_samples) {
                let start = self.frames_seen as f64 / self.sample_rate as f64;
                self.frames_seen += (samples.len() / self.channels as usize) as u64;
                return Ok(Some(AudioChunk::new(
                    samples,
                    self.sample_rate,
                    self.channels,
                    start,
                )));
            }

            if self.stopped.load(Ordering::SeqCst) {
                // Emit whatever tail remains, then report stream end.
                let tail: Vec<i16> = match self.buffer.lock() {
                    Ok(mut buf) => buf.drain(..).collect(),
                    Err(_) => Vec::new(),
                };
                if tail.is_empty() {
                    return Ok(None);
                }
                let start = self.frames_seen as f64 / self.sample_rate as f64;
                self.frames_seen += (tail.len() / self.channels as usize) as u64;
                return Ok(Some(AudioChunk::new(
                    tail,
                    self.sample_rate,
                    self.channels,
                    start,
                )));
            }

            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_chunk_duration() {
        // Device lookup happens after parameter validation, so this fails
        // deterministically even on machines with no audio hardware.
        let err = CpalAudioSource::new(None, 16000, 1, 0.0).unwrap_err();
        assert!(err.to_string().contains("chunk_sec"));
    }
}
