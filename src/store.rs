//! Persistent storage for recorded commands.
//!
//! The whole registry is written as one JSON object keyed by command name,
//! in insertion order:
//!
//! ```json
//! { "lights on": { "sample_rate": 44100, "samples": [0.0, 0.12, ...] } }
//! ```
//!
//! Older documents stored a bare sample array per command with no rate;
//! those still load and are reported with `sample_rate: None`.

use crate::error::{Result, VoxcmdError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Samples of one persisted command.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredClip {
    /// `None` for legacy entries that did not record their rate.
    pub sample_rate: Option<u32>,
    pub samples: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ClipRepr {
    Tagged { sample_rate: u32, samples: Vec<f64> },
    Bare(Vec<f64>),
}

impl Serialize for StoredClip {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // f32 -> f64 is exact, so the text form round-trips bit for bit.
        let samples: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
        let repr = match self.sample_rate {
            Some(sample_rate) => ClipRepr::Tagged {
                sample_rate,
                samples,
            },
            None => ClipRepr::Bare(samples),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StoredClip {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (sample_rate, samples) = match ClipRepr::deserialize(deserializer)? {
            ClipRepr::Tagged {
                sample_rate,
                samples,
            } => (Some(sample_rate), samples),
            ClipRepr::Bare(samples) => (None, samples),
        };
        Ok(Self {
            sample_rate,
            samples: samples.into_iter().map(|s| s as f32).collect(),
        })
    }
}

/// Every persisted command, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredCommands {
    entries: Vec<(String, StoredClip)>,
}

impl StoredCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, replacing any earlier entry with the same name in place.
    pub fn insert(&mut self, name: String, clip: StoredClip) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = clip,
            None => self.entries.push((name, clip)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoredClip)> {
        self.entries.iter().map(|(name, clip)| (name.as_str(), clip))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| VoxcmdError::PersistFailed {
            message: format!("Failed to serialize commands: {}", e),
        })
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| VoxcmdError::PersistFailed {
            message: format!("Failed to parse command store: {}", e),
        })
    }
}

impl IntoIterator for StoredCommands {
    type Item = (String, StoredClip);
    type IntoIter = std::vec::IntoIter<(String, StoredClip)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for StoredCommands {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, clip) in &self.entries {
            map.serialize_entry(name, clip)?;
        }
        map.end()
    }
}

struct StoredCommandsVisitor;

impl<'de> Visitor<'de> for StoredCommandsVisitor {
    type Value = StoredCommands;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from command name to samples")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Self::Value, M::Error> {
        let mut commands = StoredCommands::new();
        while let Some((name, clip)) = access.next_entry::<String, StoredClip>()? {
            commands.insert(name, clip);
        }
        Ok(commands)
    }
}

impl<'de> Deserialize<'de> for StoredCommands {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(StoredCommandsVisitor)
    }
}

/// Backing store for the command registry.
pub trait CommandStore: Send {
    /// Read every persisted command. A store that was never written is empty.
    fn load(&self) -> Result<StoredCommands>;

    /// Replace the persisted document. Must not return until the write is
    /// complete, and must never leave a partially written document behind.
    fn save(&mut self, commands: &StoredCommands) -> Result<()>;
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn persist_error(action: &str, path: &Path, e: std::io::Error) -> VoxcmdError {
    VoxcmdError::PersistFailed {
        message: format!("Failed to {} {}: {}", action, path.display(), e),
    }
}

/// Flush the directory entry created by a rename.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
        debug!("Could not sync {}: {}", parent.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

impl CommandStore for JsonFileStore {
    fn load(&self) -> Result<StoredCommands> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(StoredCommands::new()),
            Ok(contents) => StoredCommands::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredCommands::new()),
            Err(e) => Err(persist_error("read", &self.path, e)),
        }
    }

    fn save(&mut self, commands: &StoredCommands) -> Result<()> {
        let json = commands.to_json()?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| persist_error("create", parent, e))?;
        }

        // Write beside the target and rename over it so readers only ever
        // see the old or the new document. The data must reach the disk
        // before the rename does.
        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(|e| persist_error("create", &temp, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| persist_error("write", &temp, e))?;
        drop(file);
        fs::rename(&temp, &self.path).map_err(|e| persist_error("replace", &self.path, e))?;
        sync_parent_dir(&self.path);

        debug!(path = %self.path.display(), commands = commands.len(), "Saved command store");
        Ok(())
    }
}

/// In-memory store holding the serialized document.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    document: Option<String>,
    fail_saves: bool,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing JSON document.
    pub fn with_document(document: &str) -> Self {
        Self {
            document: Some(document.to_string()),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail.
    pub fn with_save_failure(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn set_save_failure(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl CommandStore for MemoryStore {
    fn load(&self) -> Result<StoredCommands> {
        match &self.document {
            Some(document) => StoredCommands::from_json(document),
            None => Ok(StoredCommands::new()),
        }
    }

    fn save(&mut self, commands: &StoredCommands) -> Result<()> {
        if self.fail_saves {
            return Err(VoxcmdError::PersistFailed {
                message: "memory store rejected the write".to_string(),
            });
        }
        self.document = Some(commands.to_json()?);
        self.save_count += 1;
        Ok(())
    }
}
