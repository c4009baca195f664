use crate::audio::decode::ChunkFormat;
use crate::defaults;
use crate::error::{Result, VoxcmdError};
use crossbeam_channel::Sender;

/// Sending half of the channel a capture device pushes chunks into.
pub type ChunkSender = Sender<Vec<u8>>;

/// Trait for live capture devices.
///
/// A device is opened with a [`ChunkSender`] and delivers compressed audio
/// chunks into it from its own callback thread until it is closed. This lets
/// the recording session swap a real microphone for a scripted one in tests.
pub trait CaptureDevice: Send {
    /// Acquire the device and begin delivering chunks.
    ///
    /// # Errors
    /// [`VoxcmdError::CaptureUnavailable`] if the device cannot be acquired,
    /// e.g. because permission was denied.
    fn open(&mut self, chunks: ChunkSender) -> Result<()>;

    /// Release the device.
    ///
    /// Any audio buffered inside the device must be delivered before this
    /// returns; no chunk may be sent afterwards.
    fn close(&mut self) -> Result<()>;

    /// Layout of the chunks this device produces.
    fn format(&self) -> ChunkFormat;
}

/// Scripted capture device for testing.
///
/// Replays a fixed list of chunks as soon as it is opened.
#[derive(Debug, Clone)]
pub struct ScriptedCaptureDevice {
    chunks: Vec<Vec<u8>>,
    format: ChunkFormat,
    sender: Option<ChunkSender>,
    should_fail_open: bool,
    should_fail_close: bool,
    error_message: String,
    open_count: usize,
}

impl ScriptedCaptureDevice {
    /// Create a device producing no chunks, in raw mono f32 at the default rate.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            format: ChunkFormat::RawF32 {
                sample_rate: defaults::SAMPLE_RATE,
                channels: 1,
            },
            sender: None,
            should_fail_open: false,
            should_fail_close: false,
            error_message: "scripted capture error".to_string(),
            open_count: 0,
        }
    }

    /// Chunks delivered on every open.
    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Convenience: split `samples` into raw f32 chunks of `chunk_len` samples.
    pub fn with_samples(mut self, samples: &[f32], chunk_len: usize) -> Self {
        self.chunks = samples
            .chunks(chunk_len.max(1))
            .map(|chunk| chunk.iter().flat_map(|s| s.to_le_bytes()).collect())
            .collect();
        self
    }

    pub fn with_format(mut self, format: ChunkFormat) -> Self {
        self.format = format;
        self
    }

    /// Fail on open, as if microphone permission were denied.
    pub fn with_open_failure(mut self) -> Self {
        self.should_fail_open = true;
        self
    }

    pub fn with_close_failure(mut self) -> Self {
        self.should_fail_close = true;
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn is_open(&self) -> bool {
        self.sender.is_some()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.open_count
    }
}

impl Default for ScriptedCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for ScriptedCaptureDevice {
    fn open(&mut self, chunks: ChunkSender) -> Result<()> {
        if self.should_fail_open {
            return Err(VoxcmdError::CaptureUnavailable {
                message: self.error_message.clone(),
            });
        }
        for chunk in &self.chunks {
            // A dropped receiver just means nobody is listening any more.
            if chunks.send(chunk.clone()).is_err() {
                break;
            }
        }
        self.sender = Some(chunks);
        self.open_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.should_fail_close {
            return Err(VoxcmdError::CaptureUnavailable {
                message: self.error_message.clone(),
            });
        }
        self.sender = None;
        Ok(())
    }

    fn format(&self) -> ChunkFormat {
        self.format
    }
}
