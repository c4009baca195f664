//! Default configuration constants for voxcmd.
//!
//! Shared between the config types and the audio stages so the two never
//! drift apart.

/// Default ambient sample rate in Hz.
///
/// Used when a persisted command does not record its own rate, and as the
/// preferred capture rate for live recording.
pub const SAMPLE_RATE: u32 = 44100;

/// Interval between compressed chunks delivered by a capture device.
pub const CHUNK_INTERVAL_MS: u32 = 100;

/// Number of leading samples used to estimate the noise floor.
pub const NOISE_WINDOW: usize = 2048;

/// Fraction of the estimated noise floor subtracted from every sample.
pub const NOISE_RATIO: f32 = 0.5;

/// Peak amplitude after normalization.
///
/// Leaves headroom below the `[-1.0, 1.0]` clamp applied by the encoder.
pub const NORMALIZE_CEILING: f32 = 0.99;

/// Largest audio file accepted by `add` (16 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// File extensions accepted for uploaded command audio.
///
/// WAV goes through hound, the rest through symphonia. WMA has no
/// decoder and is refused.
pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] =
    &["wav", "wave", "mp3", "ogg", "oga", "flac", "aac", "m4a"];

/// File name of the persisted command store inside the data directory.
pub const STORE_FILE_NAME: &str = "commands.json";

/// Application directory name under the XDG config/data roots.
pub const APP_DIR: &str = "voxcmd";

/// Returns true if `ext` is an accepted audio file extension.
///
/// Matching is case-insensitive.
pub fn is_allowed_audio_extension(ext: &str) -> bool {
    ALLOWED_AUDIO_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_interval_is_100ms() {
        assert_eq!(CHUNK_INTERVAL_MS, 100);
    }

    #[test]
    fn normalize_ceiling_leaves_headroom() {
        assert!(NORMALIZE_CEILING < 1.0);
        assert_eq!(NORMALIZE_CEILING, 0.99);
    }

    #[test]
    fn allowed_extension_is_case_insensitive() {
        assert!(is_allowed_audio_extension("wav"));
        assert!(is_allowed_audio_extension("WAV"));
        assert!(is_allowed_audio_extension("Wave"));
        assert!(is_allowed_audio_extension("MP3"));
        assert!(is_allowed_audio_extension("flac"));
        assert!(is_allowed_audio_extension("m4a"));
        assert!(!is_allowed_audio_extension("wma"));
        assert!(!is_allowed_audio_extension(""));
    }
}
