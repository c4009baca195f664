//! Processing pipeline: noise reduction, normalization, encoding.
//!
//! An [`AudioPipeline`] is the explicitly owned processing context for one
//! session. Its noise reducer keeps the profile estimated from the first
//! buffer, so create a fresh pipeline for each session that should
//! re-estimate.

use crate::audio::noise::NoiseReducer;
use crate::audio::normalize::Normalizer;
use crate::audio::pcm::PcmBuffer;
use crate::audio::wav::{EncodedArtifact, WaveEncoder};
use crate::config::ProcessingConfig;
use crate::error::Result;
use tracing::debug;

/// A processed clip: the final samples and their encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedClip {
    pub pcm: PcmBuffer,
    pub artifact: EncodedArtifact,
}

/// Turns a decoded buffer into a finished clip.
///
/// The command registry calls this on a cache miss only.
pub trait ClipProcessor {
    fn process(&mut self, buffer: PcmBuffer) -> Result<ProcessedClip>;
}

/// Default processing chain.
#[derive(Debug, Clone, Default)]
pub struct AudioPipeline {
    reducer: NoiseReducer,
    normalizer: Normalizer,
    encoder: WaveEncoder,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            reducer: NoiseReducer::with_params(config.noise_window, config.noise_ratio),
            normalizer: Normalizer::with_ceiling(config.normalize_ceiling),
            encoder: WaveEncoder::new(),
        }
    }

    pub fn reducer(&self) -> &NoiseReducer {
        &self.reducer
    }

    /// Noise reduction followed by peak normalization.
    pub fn clean(&mut self, buffer: PcmBuffer) -> PcmBuffer {
        let reduced = self.reducer.reduce(buffer);
        self.normalizer.normalize(reduced)
    }

    /// Clean `buffer` and encode the result.
    pub fn process_and_encode(&mut self, buffer: PcmBuffer) -> Result<EncodedArtifact> {
        Ok(self.process(buffer)?.artifact)
    }
}

impl ClipProcessor for AudioPipeline {
    fn process(&mut self, buffer: PcmBuffer) -> Result<ProcessedClip> {
        let input_len = buffer.len();
        let pcm = self.clean(buffer);
        let artifact = self.encoder.encode(pcm.sample_rate, &pcm.samples)?;
        debug!(
            samples = input_len,
            peak = pcm.peak(),
            bytes = artifact.len(),
            "Processed clip"
        );
        Ok(ProcessedClip { pcm, artifact })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| ((i as f32) * 0.1).sin() * amplitude)
            .collect()
    }

    #[test]
    fn process_and_encode_produces_full_length_wav() {
        let mut pipeline = AudioPipeline::new();
        let artifact = pipeline
            .process_and_encode(PcmBuffer::new(44100, tone(6000, 0.2)))
            .unwrap();

        let bytes = artifact.as_bytes();
        assert_eq!(bytes.len(), 12044);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn processed_clip_peaks_at_ceiling() {
        let mut pipeline = AudioPipeline::new();
        let clip = pipeline.process(PcmBuffer::new(16000, tone(4000, 0.1))).unwrap();

        assert!((clip.pcm.peak() - 0.99).abs() < 1e-5);
        assert_eq!(clip.pcm.sample_rate, 16000);
        assert_eq!(clip.pcm.len(), 4000);
    }

    #[test]
    fn silent_input_stays_silent() {
        let mut pipeline = AudioPipeline::new();
        let clip = pipeline.process(PcmBuffer::silence(16000, 100)).unwrap();

        assert!(clip.pcm.samples.iter().all(|&s| s == 0.0));
        assert!(clip.artifact.as_bytes()[44..].iter().all(|&b| b == 0));
    }

    #[test]
    fn pipeline_reuses_noise_profile_across_buffers() {
        let mut pipeline = AudioPipeline::new();
        pipeline.process(PcmBuffer::new(16000, vec![0.2; 100])).unwrap();
        let first = pipeline.reducer().profile();

        pipeline.process(PcmBuffer::new(16000, vec![0.6; 100])).unwrap();

        assert_eq!(pipeline.reducer().profile(), first);
    }

    #[test]
    fn from_config_applies_ceiling() {
        let config = ProcessingConfig {
            noise_window: 16,
            noise_ratio: 0.0,
            normalize_ceiling: 0.5,
        };
        let mut pipeline = AudioPipeline::from_config(&config);
        let clip = pipeline.process(PcmBuffer::new(16000, vec![0.1, -0.2])).unwrap();

        assert!((clip.pcm.peak() - 0.5).abs() < 1e-6);
    }
}
