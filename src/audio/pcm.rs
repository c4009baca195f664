//! In-memory single-channel PCM audio.

use std::time::Duration;

/// Mono 32-bit float audio plus its sample rate.
///
/// Every stage of the pipeline takes a buffer by value and hands back a
/// buffer of the same length and rate. Samples are expected to lie in
/// `[-1.0, 1.0]`, but nothing here clamps them: that is the encoder's job.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// A buffer of `len` zero samples.
    pub fn silence(sample_rate: u32, len: usize) -> Self {
        Self::new(sample_rate, vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length at the buffer's sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Maximum absolute sample value, or 0.0 for an empty buffer.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |max, s| max.max(s.abs()))
    }

    /// Mean absolute value over the first `window` samples.
    ///
    /// Uses `min(window, len)` samples; an empty buffer yields 0.0.
    pub fn mean_abs(&self, window: usize) -> f32 {
        let count = window.min(self.samples.len());
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self.samples[..count]
            .iter()
            .map(|s| s.abs() as f64)
            .sum();
        (sum / count as f64) as f32
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
