use crate::defaults;
use crate::error::{Result, VoxcmdError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub processing: ProcessingConfig,
    pub store: StoreConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    /// Ambient rate for capture and for stored commands without their own rate.
    pub sample_rate: u32,
    pub chunk_interval_ms: u32,
}

/// Noise reduction and normalization parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    pub noise_window: usize,
    pub noise_ratio: f32,
    pub normalize_ceiling: f32,
}

/// Command store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Defaults to `$XDG_DATA_HOME/voxcmd/commands.json` when unset.
    pub path: Option<PathBuf>,
    pub max_upload_bytes: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            chunk_interval_ms: defaults::CHUNK_INTERVAL_MS,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            noise_window: defaults::NOISE_WINDOW,
            noise_ratio: defaults::NOISE_RATIO,
            normalize_ceiling: defaults::NORMALIZE_CEILING,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path)?;
        let contents = String::from_utf8(bytes).map_err(|e| VoxcmdError::ConfigParse {
            message: format!("{} is not valid UTF-8: {}", path.display(), e),
        })?;
        Ok(Self::parse(&contents)?)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXCMD_AUDIO_DEVICE → audio.device
    /// - VOXCMD_SAMPLE_RATE → audio.sample_rate
    /// - VOXCMD_STORE → store.path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("VOXCMD_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(rate) = std::env::var("VOXCMD_SAMPLE_RATE")
            && !rate.is_empty()
        {
            match rate.parse::<u32>() {
                Ok(rate) => self.audio.sample_rate = rate,
                Err(e) => warn!("Ignoring VOXCMD_SAMPLE_RATE={:?}: {}", rate, e),
            }
        }

        if let Ok(store) = std::env::var("VOXCMD_STORE")
            && !store.is_empty()
        {
            self.store.path = Some(PathBuf::from(store));
        }

        self
    }

    /// Reject values the audio stages cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be greater than zero"));
        }
        if self.audio.chunk_interval_ms == 0 {
            return Err(invalid(
                "audio.chunk_interval_ms",
                "must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.processing.noise_ratio) {
            return Err(invalid(
                "processing.noise_ratio",
                "must be between 0.0 and 1.0",
            ));
        }
        if !(self.processing.normalize_ceiling > 0.0 && self.processing.normalize_ceiling <= 1.0) {
            return Err(invalid(
                "processing.normalize_ceiling",
                "must be in (0.0, 1.0]",
            ));
        }
        Ok(())
    }

    /// Resolved location of the command store.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(default_store_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxcmd/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(defaults::APP_DIR)
            .join("config.toml")
    }
}

/// Returns ~/.local/share/voxcmd/commands.json on Linux
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(defaults::APP_DIR)
        .join(defaults::STORE_FILE_NAME)
}

fn invalid(key: &str, message: &str) -> VoxcmdError {
    VoxcmdError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
