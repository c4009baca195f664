//! Playback of encoded commands.
//!
//! At most one playback per command name is active at a time. Starting a
//! name that is already playing stops the running playback first; distinct
//! names may overlap.

use crate::audio::wav::EncodedArtifact;
use crate::error::Result;
use std::collections::HashMap;
use tracing::debug;

/// A running playback.
pub trait PlaybackHandle: Send {
    /// Stop output immediately. Calling it twice is harmless.
    fn stop(&mut self);

    /// True once the audio has played to the end or was stopped.
    fn is_finished(&self) -> bool;
}

/// Something that can play an encoded artifact.
pub trait Player {
    type Handle: PlaybackHandle;

    fn start(&mut self, artifact: &EncodedArtifact) -> Result<Self::Handle>;
}

/// Tracks the active playback of every command name.
pub struct PlaybackManager<P: Player> {
    player: P,
    active: HashMap<String, P::Handle>,
}

impl<P: Player> PlaybackManager<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            active: HashMap::new(),
        }
    }

    /// Play `artifact` under `name`, stopping any playback of the same name.
    pub fn play(&mut self, name: &str, artifact: &EncodedArtifact) -> Result<()> {
        self.reap();
        if let Some(mut previous) = self.active.remove(name) {
            debug!(name, "Stopping previous playback");
            previous.stop();
        }

        let handle = self.player.start(artifact)?;
        debug!(name, bytes = artifact.len(), "Playback started");
        self.active.insert(name.to_string(), handle);
        Ok(())
    }

    /// Stop playback of `name`. Returns whether anything was playing.
    pub fn stop(&mut self, name: &str) -> bool {
        self.reap();
        match self.active.remove(name) {
            Some(mut handle) => {
                handle.stop();
                debug!(name, "Playback stopped");
                true
            }
            None => false,
        }
    }

    /// Stop `name` if it is playing, otherwise start it.
    ///
    /// Returns true if playback is running afterwards.
    pub fn toggle(&mut self, name: &str, artifact: &EncodedArtifact) -> Result<bool> {
        if self.stop(name) {
            Ok(false)
        } else {
            self.play(name, artifact)?;
            Ok(true)
        }
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.active
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Names with unfinished playback.
    pub fn playing(&self) -> Vec<&str> {
        self.active
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn stop_all(&mut self) {
        for (_, mut handle) in self.active.drain() {
            handle.stop();
        }
    }

    /// Drop handles whose audio has ended.
    fn reap(&mut self) {
        self.active.retain(|_, handle| !handle.is_finished());
    }
}

impl<P: Player> Drop for PlaybackManager<P> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(feature = "cpal-audio")]
pub use self::cpal_output::{CpalPlayback, CpalPlayer};

#[cfg(feature = "cpal-audio")]
mod cpal_output {
    use super::{PlaybackHandle, Player};
    use crate::audio::capture::with_suppressed_stderr;
    use crate::audio::decode::{ChunkDecoder, WavDecoder};
    use crate::audio::wav::EncodedArtifact;
    use crate::error::{Result, VoxcmdError};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing::warn;

    fn playback_error(message: String) -> VoxcmdError {
        VoxcmdError::Playback { message }
    }

    /// Wrapper for cpal::Stream to make it Send.
    ///
    /// SAFETY: the stream is only paused or dropped through `&mut self` on
    /// the handle's owner.
    struct SendableStream(cpal::Stream);

    unsafe impl Send for SendableStream {}

    /// Plays artifacts on the default output device.
    #[derive(Debug, Default)]
    pub struct CpalPlayer;

    impl CpalPlayer {
        pub fn new() -> Self {
            Self
        }
    }

    /// Handle to one output stream.
    pub struct CpalPlayback {
        stream: Option<SendableStream>,
        finished: Arc<AtomicBool>,
    }

    impl PlaybackHandle for CpalPlayback {
        fn stop(&mut self) {
            if let Some(stream) = self.stream.take() {
                let _ = stream.0.pause();
            }
            self.finished.store(true, Ordering::SeqCst);
        }

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    /// Mono samples fanned out to every output channel, then silence.
    struct Cursor {
        samples: Arc<[f32]>,
        position: usize,
        finished: Arc<AtomicBool>,
    }

    impl Cursor {
        fn fill<T>(&mut self, data: &mut [T], channels: usize, convert: impl Fn(f32) -> T) {
            for frame in data.chunks_mut(channels.max(1)) {
                let value = match self.samples.get(self.position) {
                    Some(&sample) => {
                        self.position += 1;
                        sample
                    }
                    None => {
                        self.finished.store(true, Ordering::SeqCst);
                        0.0
                    }
                };
                for slot in frame.iter_mut() {
                    *slot = convert(value);
                }
            }
        }
    }

    impl Player for CpalPlayer {
        type Handle = CpalPlayback;

        fn start(&mut self, artifact: &EncodedArtifact) -> Result<CpalPlayback> {
            let pcm = WavDecoder.decode(artifact.as_bytes())?;
            let rate = pcm.sample_rate;

            let device = with_suppressed_stderr(|| cpal::default_host().default_output_device())
                .ok_or_else(|| playback_error("no default output device".to_string()))?;

            // Prefer a configuration that runs at the artifact's own rate.
            let supported = device
                .supported_output_configs()
                .map_err(|e| playback_error(format!("Failed to query output configs: {}", e)))?
                .find(|range| {
                    range.min_sample_rate().0 <= rate
                        && rate <= range.max_sample_rate().0
                        && matches!(
                            range.sample_format(),
                            cpal::SampleFormat::F32 | cpal::SampleFormat::I16
                        )
                })
                .ok_or_else(|| {
                    playback_error(format!("output device does not support {} Hz", rate))
                })?
                .with_sample_rate(cpal::SampleRate(rate));

            let channels = supported.channels() as usize;
            let stream_config = supported.config();
            let finished = Arc::new(AtomicBool::new(false));
            let mut cursor = Cursor {
                samples: Arc::from(pcm.into_samples()),
                position: 0,
                finished: Arc::clone(&finished),
            };
            let err_callback = |err| {
                warn!("Playback stream error: {}", err);
            };

            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        cursor.fill(data, channels, |s| s);
                    },
                    err_callback,
                    None,
                ),
                _ => device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        cursor.fill(data, channels, |s| (s.clamp(-1.0, 1.0) * 32767.0) as i16);
                    },
                    err_callback,
                    None,
                ),
            }
            .map_err(|e| playback_error(format!("Failed to build output stream: {}", e)))?;

            stream
                .play()
                .map_err(|e| playback_error(format!("Failed to start output stream: {}", e)))?;

            Ok(CpalPlayback {
                stream: Some(SendableStream(stream)),
                finished,
            })
        }
    }

}
