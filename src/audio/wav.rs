//! WAV container encoding for finished command clips.
//!
//! The layout is fixed: a 44-byte RIFF header (mono, 16-bit PCM) followed by
//! the sample payload. Existing artifacts depend on the exact bytes, so the
//! encoder writes the header by hand instead of going through `hound`.

use crate::error::{Result, VoxcmdError};
use std::sync::Arc;

/// Size of the RIFF/WAVE header written in front of the payload.
pub const HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BYTES_PER_SAMPLE: u16 = 2;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Immutable encoded audio, shared cheaply between the registry and callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact(Arc<[u8]>);

impl EncodedArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if both handles point at the same allocation.
    pub fn same_as(&self, other: &EncodedArtifact) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Parse the header back out of the artifact.
    pub fn header(&self) -> Result<WavHeader> {
        WavHeader::parse(&self.0)
    }
}

impl AsRef<[u8]> for EncodedArtifact {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EncodedArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

/// Serializes PCM samples into the fixed mono 16-bit WAV layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveEncoder;

impl WaveEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `samples` at `sample_rate`.
    ///
    /// Output is always `44 + samples.len() * 2` bytes. Fails only when the
    /// payload does not fit the 32-bit size fields of the header.
    pub fn encode(&self, sample_rate: u32, samples: &[f32]) -> Result<EncodedArtifact> {
        let data_len = samples
            .len()
            .checked_mul(BYTES_PER_SAMPLE as usize)
            .and_then(|len| u32::try_from(len).ok())
            .filter(|len| len.checked_add(36).is_some())
            .ok_or_else(|| VoxcmdError::EncodeFailed {
                message: format!("{} samples exceed the WAV size limit", samples.len()),
            })?;
        let byte_rate = sample_rate
            .checked_mul(u32::from(CHANNELS * BYTES_PER_SAMPLE))
            .ok_or_else(|| VoxcmdError::EncodeFailed {
                message: format!("sample rate {} is out of range", sample_rate),
            })?;

        let mut buf = Vec::with_capacity(HEADER_LEN + data_len as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt sub-chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        buf.extend_from_slice(&PCM_FORMAT.to_le_bytes());
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&(CHANNELS * BYTES_PER_SAMPLE).to_le_bytes());
        buf.extend_from_slice(&(BYTES_PER_SAMPLE * 8).to_le_bytes());

        // data sub-chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        for &sample in samples {
            buf.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
        }

        Ok(buf.into())
    }
}

/// Convert one float sample to 16-bit PCM.
///
/// Negative values scale by 32768 and non-negative values by 32767, so both
/// -1.0 and 1.0 map onto the ends of the i16 range.
pub fn sample_to_i16(sample: f32) -> i16 {
    // NaN clamps to NaN; treat it as silence.
    let v = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    if v < 0.0 {
        (v * 32768.0).round() as i16
    } else {
        (v * 32767.0).round() as i16
    }
}

/// Header fields of an encoded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_len: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Parse the fixed 44-byte header.
    ///
    /// Only the canonical layout written by [`WaveEncoder`] is accepted: the
    /// `fmt ` chunk must immediately follow `WAVE` and `data` must sit at
    /// offset 36.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VoxcmdError::DecodeFailed {
                message: format!("WAV header truncated ({} bytes)", bytes.len()),
            });
        }
        expect_tag(bytes, 0, b"RIFF")?;
        expect_tag(bytes, 8, b"WAVE")?;
        expect_tag(bytes, 12, b"fmt ")?;
        expect_tag(bytes, 36, b"data")?;

        Ok(Self {
            riff_len: read_u32(bytes, 4),
            audio_format: read_u16(bytes, 20),
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            bits_per_sample: read_u16(bytes, 34),
            data_len: read_u32(bytes, 40),
        })
    }

    /// Number of samples in the payload.
    pub fn sample_count(&self) -> usize {
        match self.block_align {
            0 => 0,
            align => self.data_len as usize / align as usize,
        }
    }
}

fn expect_tag(bytes: &[u8], offset: usize, tag: &[u8; 4]) -> Result<()> {
    if &bytes[offset..offset + 4] == tag {
        Ok(())
    } else {
        Err(VoxcmdError::DecodeFailed {
            message: format!(
                "expected {:?} at offset {}",
                String::from_utf8_lossy(tag),
                offset
            ),
        })
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn payload(artifact: &EncodedArtifact) -> Vec<i16> {
        artifact.as_bytes()[HEADER_LEN..]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn output_length_is_header_plus_two_bytes_per_sample() {
        let artifact = WaveEncoder::new().encode(44100, &[0.0; 6000]).unwrap();
        assert_eq!(artifact.len(), 12044);
    }

    #[test]
    fn empty_input_produces_bare_header() {
        let artifact = WaveEncoder::new().encode(16000, &[]).unwrap();
        assert_eq!(artifact.len(), HEADER_LEN);
        assert_eq!(artifact.header().unwrap().data_len, 0);
    }

    #[test]
    fn header_fields_match_fixed_layout() {
        let artifact = WaveEncoder::new().encode(48000, &[0.1; 10]).unwrap();
        let bytes = artifact.as_bytes();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[4..8], &(36u32 + 20).to_le_bytes());
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[16..20], &16u32.to_le_bytes());
        assert_eq!(&bytes[20..22], &1u16.to_le_bytes());
        assert_eq!(&bytes[22..24], &1u16.to_le_bytes());
        assert_eq!(&bytes[24..28], &48000u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &96000u32.to_le_bytes());
        assert_eq!(&bytes[32..34], &2u16.to_le_bytes());
        assert_eq!(&bytes[34..36], &16u16.to_le_bytes());
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(&bytes[40..44], &20u32.to_le_bytes());
    }

    #[test]
    fn parsed_header_recovers_rate_channels_and_depth() {
        let artifact = WaveEncoder::new().encode(22050, &[0.5; 7]).unwrap();
        let header = artifact.header().unwrap();

        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.channels, 1);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.audio_format, 1);
        assert_eq!(header.sample_count(), 7);
    }

    #[test]
    fn encoding_is_deterministic() {
        let samples: Vec<f32> = (0..500).map(|i| ((i as f32) * 0.01).sin()).collect();
        let encoder = WaveEncoder::new();
        let a = encoder.encode(16000, &samples).unwrap();
        let b = encoder.encode(16000, &samples).unwrap();
        assert_eq!(a, b);
        assert!(!a.same_as(&b));
    }

    #[test]
    fn asymmetric_scaling_hits_both_extremes() {
        let artifact = WaveEncoder::new()
            .encode(16000, &[-1.0, 1.0, 0.0, -0.5, 0.5])
            .unwrap();
        assert_eq!(payload(&artifact), vec![-32768, 32767, 0, -16384, 16384]);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let artifact = WaveEncoder::new()
            .encode(16000, &[-3.0, 2.5, f32::NAN])
            .unwrap();
        assert_eq!(payload(&artifact), vec![-32768, 32767, 0]);
    }

    #[test]
    fn sample_conversion_rounds_to_nearest() {
        // 0.25 * 32767 = 8191.75
        assert_eq!(sample_to_i16(0.25), 8192);
        // -0.25 * 32768 = -8192 exactly
        assert_eq!(sample_to_i16(-0.25), -8192);
        assert_eq!(sample_to_i16(0.99), 32439);
    }

    #[test]
    fn hound_reads_encoded_artifact() {
        let samples = [0.0f32, 0.25, -0.25, 0.99];
        let artifact = WaveEncoder::new().encode(44100, &samples).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(artifact.as_bytes().to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 8192, -8192, 32439]);
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let result = WavHeader::parse(b"RIFF\x00\x00");
        assert!(matches!(result, Err(VoxcmdError::DecodeFailed { .. })));
    }

    #[test]
    fn parse_rejects_missing_riff_tag() {
        let mut bytes = WaveEncoder::new()
            .encode(16000, &[0.0; 4])
            .unwrap()
            .as_bytes()
            .to_vec();
        bytes[0..4].copy_from_slice(b"XXXX");
        match WavHeader::parse(&bytes) {
            Err(VoxcmdError::DecodeFailed { message }) => {
                assert!(message.contains("RIFF"), "unexpected message: {}", message);
            }
            other => panic!("Expected DecodeFailed, got {:?}", other),
        }
    }

    #[test]
    fn artifact_from_vec_keeps_bytes() {
        let artifact = EncodedArtifact::from(vec![1u8, 2, 3]);
        assert_eq!(artifact.as_ref(), &[1, 2, 3]);
        assert!(!artifact.is_empty());
        let clone = artifact.clone();
        assert!(artifact.same_as(&clone));
    }
}
