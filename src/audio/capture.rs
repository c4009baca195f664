//! Live microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! The device captures at its native rate and channel layout, slices the
//! stream into fixed-interval chunks of little-endian f32 frames, and pushes
//! each chunk into the session's channel from the CPAL callback thread.

use crate::audio::decode::ChunkFormat;
use crate::audio::recorder::{CaptureDevice, ChunkSender};
use crate::defaults;
use crate::error::{Result, VoxcmdError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL probes ALSA/JACK/PipeWire backends on enumeration, and those print
/// harmless but alarming messages straight to fd 2.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` on fd 2. Sound as long as no other thread
/// is rewiring stderr at the same time.
pub(crate) fn with_suppressed_stderr<F, R>(f: F) -> R
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

/// Device name patterns that are never microphones.
const FILTERED_PATTERNS: &[&str] = &["surround", "front:", "rear:", "HDMI", "S/PDIF"];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// List input devices, dropping obvious non-microphones.
///
/// # Errors
/// [`VoxcmdError::CaptureUnavailable`] if the host cannot enumerate devices.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| VoxcmdError::CaptureUnavailable {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    Ok(devices
        .filter_map(|device| device.name().ok())
        .filter(|name| !should_filter_device(name))
        .collect())
}

fn find_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| VoxcmdError::CaptureUnavailable {
                    message: format!("Failed to enumerate devices: {}", e),
                })?
                .find(|dev| dev.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| VoxcmdError::CaptureUnavailable {
                    message: format!("input device not found: {}", name),
                }),
            None => host
                .default_input_device()
                .ok_or_else(|| VoxcmdError::CaptureUnavailable {
                    message: "no default input device".to_string(),
                }),
        }
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from the thread that owns the
/// `CpalCaptureDevice`, through `&mut self`.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Frames accumulated between chunk boundaries.
struct ChunkState {
    pending: Vec<f32>,
    sender: Option<ChunkSender>,
}

impl ChunkState {
    /// Append interleaved samples and emit every full chunk.
    fn push(&mut self, data: impl Iterator<Item = f32>, chunk_samples: usize) {
        self.pending.extend(data);
        while self.pending.len() >= chunk_samples {
            let chunk: Vec<f32> = self.pending.drain(..chunk_samples).collect();
            self.emit(&chunk);
        }
    }

    /// Emit whatever is left, then drop the sender.
    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest);
        }
        self.sender = None;
    }

    fn emit(&self, samples: &[f32]) {
        if let Some(sender) = &self.sender {
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            let _ = sender.send(bytes);
        }
    }
}

/// Microphone capture device backed by CPAL.
pub struct CpalCaptureDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    chunk_interval_ms: u32,
    stream: Option<SendableStream>,
    state: Arc<Mutex<ChunkState>>,
}

impl CpalCaptureDevice {
    /// Open a handle on `device_name`, or the default input device.
    ///
    /// The stream itself is not built until [`CaptureDevice::open`].
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_device(device_name)?;
        let config =
            device
                .default_input_config()
                .map_err(|e| VoxcmdError::CaptureUnavailable {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        Ok(Self {
            device,
            config,
            chunk_interval_ms: defaults::CHUNK_INTERVAL_MS,
            stream: None,
            state: Arc::new(Mutex::new(ChunkState {
                pending: Vec::new(),
                sender: None,
            })),
        })
    }

    pub fn with_chunk_interval_ms(mut self, interval_ms: u32) -> Self {
        self.chunk_interval_ms = interval_ms.max(1);
        self
    }

    /// Interleaved samples per chunk at the native rate and channel count.
    fn chunk_samples(&self) -> usize {
        let frames = (self.config.sample_rate().0 as u64 * self.chunk_interval_ms as u64) / 1000;
        (frames.max(1) as usize) * self.config.channels() as usize
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let stream_config = self.config.config();
        let chunk_samples = self.chunk_samples();
        let state = Arc::clone(&self.state);
        let err_callback = |err| {
            warn!("Audio stream error: {}", err);
        };

        let result = match self.config.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut state) = state.lock() {
                        state.push(data.iter().copied(), chunk_samples);
                    }
                },
                err_callback,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut state) = state.lock() {
                        state.push(
                            data.iter().map(|&s| s as f32 / 32768.0),
                            chunk_samples,
                        );
                    }
                },
                err_callback,
                None,
            ),
            fmt => {
                return Err(VoxcmdError::CaptureUnavailable {
                    message: format!(
                        "Unsupported native sample format: {:?}. \
                         Try specifying a device with --device.",
                        fmt
                    ),
                });
            }
        };

        result.map_err(|e| VoxcmdError::CaptureUnavailable {
            message: format!("Failed to build input stream: {}", e),
        })
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, ChunkState>> {
        self.state.lock().map_err(|e| VoxcmdError::CaptureUnavailable {
            message: format!("Failed to lock capture state: {}", e),
        })
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn open(&mut self, chunks: ChunkSender) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        {
            let mut state = self.lock_state()?;
            state.pending.clear();
            state.sender = Some(chunks);
        }

        let stream = match self.build_stream() {
            Ok(stream) => stream,
            Err(e) => {
                self.lock_state()?.sender = None;
                return Err(e);
            }
        };
        if let Err(e) = stream.play() {
            self.lock_state()?.sender = None;
            return Err(VoxcmdError::CaptureUnavailable {
                message: format!("Failed to start audio stream: {}", e),
            });
        }

        debug!(
            rate = self.config.sample_rate().0,
            channels = self.config.channels(),
            chunk_samples = self.chunk_samples(),
            "Capture stream started"
        );
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the stream stops the callback before the final flush.
        if let Some(stream) = self.stream.take() {
            let _ = stream.0.pause();
            drop(stream);
        }
        self.lock_state()?.flush();
        Ok(())
    }

    fn format(&self) -> ChunkFormat {
        ChunkFormat::RawF32 {
            sample_rate: self.config.sample_rate().0,
            channels: self.config.channels(),
        }
    }
}
