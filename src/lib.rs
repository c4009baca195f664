//! voxcmd - Named voice commands
//!
//! Records short voice commands, reduces background noise, normalizes
//! loudness, encodes them as 16-bit WAV and keeps them in a persistent
//! registry for playback.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod recording;
pub mod registry;
pub mod store;

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod logging;

// Audio model
pub use audio::pcm::PcmBuffer;
pub use audio::source::AudioInput;
pub use audio::wav::{EncodedArtifact, WaveEncoder, WavHeader};

// Capture (device → session → buffer)
pub use audio::decode::{
    ChunkDecoder, ChunkFormat, CompressedDecoder, RawPcmDecoder, WavDecoder,
};
pub use audio::recorder::{CaptureDevice, ScriptedCaptureDevice};
pub use recording::{RecordingLock, RecordingSession, SessionState};

// Processing
pub use audio::noise::{NoiseProfile, NoiseReducer};
pub use audio::normalize::Normalizer;
pub use pipeline::{AudioPipeline, ClipProcessor, ProcessedClip};

// Registry and persistence
pub use registry::{CommandEntry, CommandRegistry};
pub use store::{CommandStore, JsonFileStore, MemoryStore, StoredClip, StoredCommands};

// Playback
pub use playback::{PlaybackHandle, PlaybackManager, Player};

// Error handling
pub use error::{Result, VoxcmdError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
