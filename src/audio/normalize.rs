//! Peak normalization.

use crate::audio::pcm::PcmBuffer;
use crate::defaults;

/// Scales a buffer so its peak absolute amplitude equals `ceiling`.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    ceiling: f32,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_ceiling(defaults::NORMALIZE_CEILING)
    }

    pub fn with_ceiling(ceiling: f32) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Multiply every sample by `ceiling / peak`.
    ///
    /// Silent buffers (peak of zero) are returned unchanged.
    pub fn normalize(&self, mut buffer: PcmBuffer) -> PcmBuffer {
        let peak = buffer.peak();
        if peak > 0.0 {
            let scale = self.ceiling / peak;
            for sample in &mut buffer.samples {
                *sample *= scale;
            }
        }
        buffer
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
