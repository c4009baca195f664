//! Static noise-floor suppression.
//!
//! The reducer estimates the noise floor once, from the leading samples of
//! the first buffer it sees, and subtracts a fixed fraction of it from every
//! sample of every buffer afterwards. It does not split the signal into
//! speech and noise regions and never updates the estimate.

use crate::audio::pcm::PcmBuffer;
use crate::defaults;
use tracing::debug;

/// Estimated average absolute noise amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseProfile {
    pub level: f32,
}

impl NoiseProfile {
    /// Estimate from the first `window` samples of `buffer`.
    pub fn estimate(buffer: &PcmBuffer, window: usize) -> Self {
        Self {
            level: buffer.mean_abs(window),
        }
    }
}

/// Noise reducer owning one profile for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct NoiseReducer {
    window: usize,
    ratio: f32,
    profile: Option<NoiseProfile>,
}

impl NoiseReducer {
    pub fn new() -> Self {
        Self::with_params(defaults::NOISE_WINDOW, defaults::NOISE_RATIO)
    }

    /// Reducer with a custom estimation window and subtraction ratio.
    pub fn with_params(window: usize, ratio: f32) -> Self {
        Self {
            window,
            ratio,
            profile: None,
        }
    }

    /// The profile estimated so far, if any buffer has been processed.
    pub fn profile(&self) -> Option<NoiseProfile> {
        self.profile
    }

    /// Forget the current profile so the next buffer re-estimates it.
    pub fn reset(&mut self) {
        self.profile = None;
    }

    /// Subtract `noise_level * ratio` from every sample.
    ///
    /// The first call estimates the profile from this buffer; later calls
    /// reuse it. Length and sample rate are unchanged.
    pub fn reduce(&mut self, mut buffer: PcmBuffer) -> PcmBuffer {
        let window = self.window;
        let profile = *self.profile.get_or_insert_with(|| {
            let profile = NoiseProfile::estimate(&buffer, window);
            debug!(level = profile.level, window, "Estimated noise profile");
            profile
        });

        let offset = profile.level * self.ratio;
        if offset != 0.0 {
            for sample in &mut buffer.samples {
                *sample -= offset;
            }
        }
        buffer
    }
}

impl Default for NoiseReducer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_buffer_passes_through_unchanged() {
        let mut reducer = NoiseReducer::new();
        let input = PcmBuffer::silence(16000, 4096);

        let output = reducer.reduce(input.clone());

        assert_eq!(output, input);
        assert_eq!(reducer.profile(), Some(NoiseProfile { level: 0.0 }));
    }

    #[test]
    fn subtracts_half_the_mean_absolute_level() {
        let mut reducer = NoiseReducer::new();
        let input = PcmBuffer::new(16000, vec![0.5, -0.5, 0.5, -0.5]);

        let output = reducer.reduce(input);

        // noise_level = 0.5, offset = 0.25
        assert_eq!(output.samples, vec![0.25, -0.75, 0.25, -0.75]);
        assert_eq!(output.sample_rate, 16000);
    }

    #[test]
    fn estimates_only_from_leading_window() {
        let mut samples = vec![0.1f32; 2048];
        samples.extend(std::iter::repeat_n(0.9f32, 2048));
        let mut reducer = NoiseReducer::new();

        let output = reducer.reduce(PcmBuffer::new(16000, samples));

        let level = reducer.profile().unwrap().level;
        assert!((level - 0.1).abs() < 1e-6, "level was {}", level);
        assert_eq!(output.len(), 4096);
        assert!((output.samples[4095] - (0.9 - 0.05)).abs() < 1e-6);
    }

    #[test]
    fn short_buffer_uses_every_sample_for_estimate() {
        let mut reducer = NoiseReducer::new();
        reducer.reduce(PcmBuffer::new(8000, vec![0.2, 0.4]));

        let level = reducer.profile().unwrap().level;
        assert!((level - 0.3).abs() < 1e-6);
    }

    #[test]
    fn profile_is_reused_for_later_buffers() {
        let mut reducer = NoiseReducer::new();
        reducer.reduce(PcmBuffer::new(16000, vec![0.2; 100]));

        // A much louder second buffer must not change the estimate.
        let output = reducer.reduce(PcmBuffer::new(16000, vec![0.8; 100]));

        let level = reducer.profile().unwrap().level;
        assert!((level - 0.2).abs() < 1e-6);
        assert!((output.samples[0] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn fresh_reducer_re_estimates() {
        let mut first = NoiseReducer::new();
        first.reduce(PcmBuffer::new(16000, vec![0.2; 10]));

        let mut second = NoiseReducer::new();
        second.reduce(PcmBuffer::new(16000, vec![0.6; 10]));

        assert_ne!(first.profile(), second.profile());
    }

    #[test]
    fn reset_forgets_profile() {
        let mut reducer = NoiseReducer::new();
        reducer.reduce(PcmBuffer::new(16000, vec![0.2; 10]));
        reducer.reset();
        assert!(reducer.profile().is_none());

        reducer.reduce(PcmBuffer::new(16000, vec![0.4; 10]));
        let level = reducer.profile().unwrap().level;
        assert!((level - 0.4).abs() < 1e-6);
    }

    #[test]
    fn empty_first_buffer_yields_zero_profile() {
        let mut reducer = NoiseReducer::new();
        let output = reducer.reduce(PcmBuffer::new(16000, Vec::new()));

        assert!(output.is_empty());
        assert_eq!(reducer.profile(), Some(NoiseProfile { level: 0.0 }));
    }

    #[test]
    fn custom_ratio_is_applied() {
        let mut reducer = NoiseReducer::with_params(2048, 1.0);
        let output = reducer.reduce(PcmBuffer::new(16000, vec![0.5, 0.5]));
        assert_eq!(output.samples, vec![0.0, 0.0]);
    }
}
