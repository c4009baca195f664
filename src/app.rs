//! Command handlers behind the `voxcmd` binary.
//!
//! Each handler opens the command store, performs one operation and
//! reports to the given writer. Status messages go to stderr unless quiet.

use crate::audio::pcm::PcmBuffer;
use crate::audio::source::AudioInput;
use crate::audio::wav::WavHeader;
use crate::config::Config;
use crate::error::{Result, VoxcmdError};
use crate::pipeline::AudioPipeline;
use crate::registry::CommandRegistry;
use crate::store::JsonFileStore;
use owo_colors::OwoColorize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(feature = "cpal-audio")]
use std::time::Duration;

/// Shared state for one CLI invocation.
pub struct App {
    config: Config,
    store_path: PathBuf,
    quiet: bool,
}

impl App {
    /// `store_override` wins over the configured store path.
    pub fn new(config: Config, store_override: Option<PathBuf>, quiet: bool) -> Self {
        let store_path = store_override.unwrap_or_else(|| config.store_path());
        Self {
            config,
            store_path,
            quiet,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn open_registry(&self) -> Result<CommandRegistry<JsonFileStore>> {
        let store = JsonFileStore::new(&self.store_path);
        Ok(CommandRegistry::load(store, self.config.audio.sample_rate)?
            .with_max_upload_bytes(self.config.store.max_upload_bytes))
    }

    fn pipeline(&self) -> AudioPipeline {
        AudioPipeline::from_config(&self.config.processing)
    }

    fn status(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    /// Import a WAV file as a new command.
    pub fn add(&self, name: &str, file: &Path, out: &mut impl Write) -> Result<()> {
        let mut registry = self.open_registry()?;
        let existed = registry.contains(name);
        let artifact = registry.add(name, AudioInput::File(file.to_path_buf()), &mut self.pipeline())?;

        if existed {
            writeln!(out, "{} already registered, kept existing audio", name.trim())?;
        } else {
            writeln!(
                out,
                "{} {} ({} bytes)",
                "Added".green(),
                name.trim(),
                artifact.len()
            )?;
        }
        Ok(())
    }

    pub fn remove(&self, name: &str, out: &mut impl Write) -> Result<()> {
        let mut registry = self.open_registry()?;
        if registry.remove(name)? {
            writeln!(out, "{} {}", "Removed".green(), name.trim())?;
            Ok(())
        } else {
            Err(VoxcmdError::CommandNotFound {
                name: name.trim().to_string(),
            })
        }
    }

    pub fn list(&self, out: &mut impl Write) -> Result<()> {
        let registry = self.open_registry()?;
        if registry.is_empty() {
            self.status("No commands registered");
            return Ok(());
        }

        for (idx, entry) in registry.list().enumerate() {
            writeln!(
                out,
                "  [{}] {}  {}",
                idx,
                entry.name.green(),
                describe(&entry.clip).dimmed()
            )?;
        }
        Ok(())
    }

    /// Write the encoded audio of `name` to `output`.
    pub fn export(&self, name: &str, output: &Path, out: &mut impl Write) -> Result<()> {
        let registry = self.open_registry()?;
        let entry = registry
            .get(name)
            .ok_or_else(|| VoxcmdError::CommandNotFound {
                name: name.trim().to_string(),
            })?;

        fs::write(output, entry.artifact.as_bytes())?;
        writeln!(out, "Wrote {} to {}", entry.name, output.display())?;
        Ok(())
    }

    /// Record from the microphone until `duration` elapses or Ctrl+C.
    #[cfg(feature = "cpal-audio")]
    pub async fn record(
        &self,
        name: &str,
        duration: Duration,
        device: Option<String>,
        out: &mut impl Write,
    ) -> Result<()> {
        use crate::audio::capture::CpalCaptureDevice;
        use crate::recording::RecordingSession;

        let mut registry = self.open_registry()?;
        if registry.contains(name) {
            writeln!(
                out,
                "{} already registered; remove it first to record again",
                name.trim()
            )?;
            return Ok(());
        }

        let device_name = device.or_else(|| self.config.audio.device.clone());
        let capture = CpalCaptureDevice::new(device_name.as_deref())?
            .with_chunk_interval_ms(self.config.audio.chunk_interval_ms);
        let mut session = RecordingSession::new(capture);

        session.start()?;
        self.status(&format!(
            "Recording '{}' for up to {}... (Ctrl+C to stop)",
            name.trim(),
            humantime::format_duration(duration)
        ));

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    session.cancel()?;
                    return Err(VoxcmdError::Other(format!("Failed to wait for Ctrl+C: {}", e)));
                }
            }
        }

        let buffer = session.stop()?;
        self.status(&format!("Captured {}", describe(&buffer)));

        let artifact = registry.add(name, AudioInput::Pcm(buffer), &mut self.pipeline())?;
        writeln!(
            out,
            "{} {} ({} bytes)",
            "Recorded".green(),
            name.trim(),
            artifact.len()
        )?;
        Ok(())
    }

    /// Play `name` and wait until it finishes or Ctrl+C.
    #[cfg(feature = "cpal-audio")]
    pub async fn play(&self, name: &str) -> Result<()> {
        use crate::playback::{CpalPlayer, PlaybackManager};

        let registry = self.open_registry()?;
        let entry = registry
            .get(name)
            .ok_or_else(|| VoxcmdError::CommandNotFound {
                name: name.trim().to_string(),
            })?;

        let mut playback = PlaybackManager::new(CpalPlayer::new());
        playback.play(&entry.name, &entry.artifact)?;
        self.status(&format!("Playing '{}'", entry.name));

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        while playback.is_playing(&entry.name) {
            tokio::select! {
                _ = &mut ctrl_c => {
                    playback.stop(&entry.name);
                    break;
                }
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
        Ok(())
    }
}

/// Print the header fields of a WAV file.
pub fn info(file: &Path, out: &mut impl Write) -> Result<()> {
    let bytes = fs::read(file)?;
    let header = WavHeader::parse(&bytes)?;
    let seconds = if header.sample_rate > 0 {
        header.sample_count() as f64 / header.sample_rate as f64
    } else {
        0.0
    };

    writeln!(out, "{}", file.display())?;
    writeln!(out, "  {}     {}", "Format:".dimmed(), header.audio_format)?;
    writeln!(out, "  {}   {}", "Channels:".dimmed(), header.channels)?;
    writeln!(out, "  {} {} Hz", "Sample rate:".dimmed(), header.sample_rate)?;
    writeln!(out, "  {}       {}", "Bits:".dimmed(), header.bits_per_sample)?;
    writeln!(out, "  {}    {}", "Samples:".dimmed(), header.sample_count())?;
    writeln!(out, "  {}   {:.2}s", "Duration:".dimmed(), seconds)?;
    Ok(())
}

fn describe(clip: &PcmBuffer) -> String {
    format!(
        "{:.2}s, {} Hz, {} samples",
        clip.duration().as_secs_f64(),
        clip.sample_rate,
        clip.len()
    )
}
