//! Decoding of captured or uploaded audio into a [`PcmBuffer`].
//!
//! Capture devices deliver their audio as opaque byte chunks. Once a
//! recording stops, the chunks are concatenated and handed to the decoder
//! that matches the device's [`ChunkFormat`]. Uploaded files go through
//! [`decoder_for_extension`] or [`sniff_decoder`].

use crate::audio::pcm::PcmBuffer;
use crate::error::{Result, VoxcmdError};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Turns a complete encoded blob into mono PCM.
pub trait ChunkDecoder: Send + Sync {
    /// Decode `blob`.
    ///
    /// Multi-channel audio keeps only the first channel. An empty blob or a
    /// blob that decodes to zero samples is a [`VoxcmdError::DecodeFailed`].
    fn decode(&self, blob: &[u8]) -> Result<PcmBuffer>;
}

/// Byte layout produced by a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Interleaved little-endian f32 frames.
    RawF32 { sample_rate: u32, channels: u16 },
    /// A WAV stream split across chunks (header in the first chunk).
    Wav,
    /// A compressed container (ogg, mp4, mp3...) split across chunks.
    Compressed,
}

impl ChunkFormat {
    /// Decoder for this layout.
    pub fn decoder(&self) -> Box<dyn ChunkDecoder> {
        match *self {
            ChunkFormat::RawF32 {
                sample_rate,
                channels,
            } => Box::new(RawPcmDecoder::new(sample_rate, channels)),
            ChunkFormat::Wav => Box::new(WavDecoder),
            ChunkFormat::Compressed => Box::new(CompressedDecoder::new()),
        }
    }
}

/// Decoder for an uploaded file with extension `ext`.
///
/// `wav`/`wave` use [`WavDecoder`]; everything else goes to
/// [`CompressedDecoder`] with the extension as a probe hint.
pub fn decoder_for_extension(ext: &str) -> Box<dyn ChunkDecoder> {
    if ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave") {
        Box::new(WavDecoder)
    } else {
        Box::new(CompressedDecoder::with_extension(ext))
    }
}

/// Decoder for bytes of unknown origin: RIFF/WAVE data uses [`WavDecoder`].
pub fn sniff_decoder(blob: &[u8]) -> Box<dyn ChunkDecoder> {
    if blob.len() >= 12 && &blob[0..4] == b"RIFF" && &blob[8..12] == b"WAVE" {
        Box::new(WavDecoder)
    } else {
        Box::new(CompressedDecoder::new())
    }
}

fn empty_input() -> VoxcmdError {
    VoxcmdError::DecodeFailed {
        message: "no audio data received".to_string(),
    }
}

/// Reject buffers carrying NaN or infinite samples.
///
/// Such samples survive every later stage as NaN and serialize as `null`,
/// which the store cannot read back.
pub(crate) fn ensure_finite(buffer: PcmBuffer) -> Result<PcmBuffer> {
    match buffer.samples.iter().position(|s| !s.is_finite()) {
        Some(index) => Err(VoxcmdError::DecodeFailed {
            message: format!(
                "sample {} is not a finite number ({})",
                index, buffer.samples[index]
            ),
        }),
        None => Ok(buffer),
    }
}

/// Decodes interleaved little-endian f32 frames with a known layout.
#[derive(Debug, Clone, Copy)]
pub struct RawPcmDecoder {
    sample_rate: u32,
    channels: u16,
}

impl RawPcmDecoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl ChunkDecoder for RawPcmDecoder {
    fn decode(&self, blob: &[u8]) -> Result<PcmBuffer> {
        if blob.is_empty() {
            return Err(empty_input());
        }
        if self.channels == 0 {
            return Err(VoxcmdError::DecodeFailed {
                message: "channel count must be at least 1".to_string(),
            });
        }
        let frame_bytes = 4 * self.channels as usize;
        if blob.len() % frame_bytes != 0 {
            return Err(VoxcmdError::DecodeFailed {
                message: format!(
                    "{} bytes is not a whole number of {}-channel f32 frames",
                    blob.len(),
                    self.channels
                ),
            });
        }

        let samples: Vec<f32> = blob
            .chunks_exact(frame_bytes)
            .map(|frame| f32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]))
            .collect();

        ensure_finite(PcmBuffer::new(self.sample_rate, samples))
    }
}

/// Decodes a WAV container with `hound`, keeping the file's sample rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl ChunkDecoder for WavDecoder {
    fn decode(&self, blob: &[u8]) -> Result<PcmBuffer> {
        if blob.is_empty() {
            return Err(empty_input());
        }

        let mut reader =
            hound::WavReader::new(Cursor::new(blob)).map_err(|e| VoxcmdError::DecodeFailed {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(VoxcmdError::DecodeFailed {
                message: "WAV data declares zero channels".to_string(),
            });
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                // Full-scale for the declared bit depth, e.g. 32768 for 16-bit.
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| VoxcmdError::DecodeFailed {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        let samples: Vec<f32> = interleaved.into_iter().step_by(channels).collect();
        if samples.is_empty() {
            return Err(VoxcmdError::DecodeFailed {
                message: "WAV data contains no samples".to_string(),
            });
        }

        ensure_finite(PcmBuffer::new(spec.sample_rate, samples))
    }
}

/// Decodes compressed uploads (mp3, ogg/vorbis, flac, aac, m4a) with
/// `symphonia`, keeping the first channel of the first audio track.
#[derive(Debug, Clone, Default)]
pub struct CompressedDecoder {
    extension: Option<String>,
}

impl CompressedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `ext` as a hint when probing the container.
    pub fn with_extension(ext: &str) -> Self {
        Self {
            extension: Some(ext.to_ascii_lowercase()),
        }
    }
}

fn symphonia_failure(context: &str, e: SymphoniaError) -> VoxcmdError {
    VoxcmdError::DecodeFailed {
        message: format!("{}: {}", context, e),
    }
}

impl ChunkDecoder for CompressedDecoder {
    fn decode(&self, blob: &[u8]) -> Result<PcmBuffer> {
        if blob.is_empty() {
            return Err(empty_input());
        }

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }
        let stream = MediaSourceStream::new(Box::new(Cursor::new(blob.to_vec())), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| symphonia_failure("Unrecognized audio container", e))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| VoxcmdError::DecodeFailed {
                message: "container has no audio track".to_string(),
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| symphonia_failure("Unsupported codec", e))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(symphonia_failure("Failed to read packet", e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count().max(1);
                    sample_rate.get_or_insert(spec.rate);
                    let mut interleaved =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    interleaved.copy_interleaved_ref(decoded);
                    samples.extend(interleaved.samples().iter().step_by(channels).copied());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(symphonia_failure("Failed to decode audio", e)),
            }
        }

        let sample_rate = sample_rate.ok_or_else(|| VoxcmdError::DecodeFailed {
            message: "audio track does not declare a sample rate".to_string(),
        })?;
        if samples.is_empty() {
            return Err(VoxcmdError::DecodeFailed {
                message: "audio track contains no samples".to_string(),
            });
        }
        debug!(samples = samples.len(), sample_rate, "Decoded compressed audio");

        ensure_finite(PcmBuffer::new(sample_rate, samples))
    }
}
