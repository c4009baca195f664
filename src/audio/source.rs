//! Audio handed to the registry when a command is added.

use crate::audio::decode::{self, ensure_finite};
use crate::audio::pcm::PcmBuffer;
use crate::defaults;
use crate::error::{Result, VoxcmdError};
use std::fs;
use std::path::{Path, PathBuf};

/// Raw audio for a new command: an uploaded file, its bytes, or a recording.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioInput {
    /// Audio file on disk, decoded according to its extension.
    File(PathBuf),
    /// In-memory audio data; RIFF/WAVE is detected, anything else is probed.
    Bytes(Vec<u8>),
    /// Already decoded audio, e.g. the result of a recording session.
    Pcm(PcmBuffer),
}

impl AudioInput {
    /// Decode into PCM.
    ///
    /// Files must have an accepted extension and be no larger than
    /// `max_bytes`; byte inputs obey the same size limit. Samples that are
    /// NaN or infinite are a [`VoxcmdError::DecodeFailed`].
    pub fn into_pcm(self, max_bytes: u64) -> Result<PcmBuffer> {
        match self {
            AudioInput::File(path) => {
                let ext = check_extension(&path)?;
                let size = fs::metadata(&path)?.len();
                check_size(size, max_bytes)?;
                let bytes = fs::read(&path)?;
                decode::decoder_for_extension(ext).decode(&bytes)
            }
            AudioInput::Bytes(bytes) => {
                check_size(bytes.len() as u64, max_bytes)?;
                decode::sniff_decoder(&bytes).decode(&bytes)
            }
            AudioInput::Pcm(buffer) => {
                if buffer.is_empty() {
                    return Err(VoxcmdError::DecodeFailed {
                        message: "audio buffer is empty".to_string(),
                    });
                }
                ensure_finite(buffer)
            }
        }
    }
}

impl From<PcmBuffer> for AudioInput {
    fn from(buffer: PcmBuffer) -> Self {
        AudioInput::Pcm(buffer)
    }
}

fn check_extension(path: &Path) -> Result<&str> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if defaults::is_allowed_audio_extension(ext) {
        Ok(ext)
    } else {
        Err(VoxcmdError::UnsupportedAudioFormat {
            format: if ext.is_empty() {
                "(no extension)".to_string()
            } else {
                ext.to_string()
            },
        })
    }
}

fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        Err(VoxcmdError::AudioTooLarge { size, limit })
    } else {
        Ok(())
    }
}
