//! Named voice commands backed by a persistent store.
//!
//! Entries are keyed by their trimmed name and kept in insertion order.
//! Every mutation rewrites the whole store before returning.

use crate::audio::pcm::PcmBuffer;
use crate::audio::source::AudioInput;
use crate::audio::wav::{EncodedArtifact, WaveEncoder};
use crate::defaults;
use crate::error::{Result, VoxcmdError};
use crate::pipeline::ClipProcessor;
use crate::store::{CommandStore, StoredClip, StoredCommands};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One registered command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEntry {
    pub name: String,
    /// Processed samples, as persisted.
    pub clip: PcmBuffer,
    pub artifact: EncodedArtifact,
}

/// Insertion-ordered command registry.
pub struct CommandRegistry<S: CommandStore> {
    store: S,
    entries: Vec<CommandEntry>,
    index: HashMap<String, usize>,
    max_upload_bytes: u64,
}

impl<S: CommandStore> CommandRegistry<S> {
    /// Empty registry; nothing is read from `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            entries: Vec::new(),
            index: HashMap::new(),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }

    /// Build a registry from everything in `store`.
    ///
    /// Entries persisted without a sample rate are read at `ambient_rate`.
    /// Artifacts are re-encoded from the stored samples as-is.
    ///
    /// Keys are trimmed. Blank keys are skipped, and keys that collide once
    /// trimmed keep the first position with the last value.
    pub fn load(store: S, ambient_rate: u32) -> Result<Self> {
        let stored = store.load()?;
        let mut registry = Self::new(store);
        let encoder = WaveEncoder::new();

        for (key, StoredClip { sample_rate, samples }) in stored {
            let Ok(name) = normalize_name(&key) else {
                warn!(key = ?key, "Skipping stored command with a blank name");
                continue;
            };
            if name != key && registry.contains(name) {
                warn!(key = ?key, name, "Stored command name collides after trimming");
            }
            let clip = PcmBuffer::new(sample_rate.unwrap_or(ambient_rate), samples);
            let artifact = encoder.encode(clip.sample_rate, &clip.samples)?;
            registry.insert(CommandEntry {
                name: name.to_string(),
                clip,
                artifact,
            });
        }

        info!(commands = registry.len(), "Loaded command registry");
        Ok(registry)
    }

    /// Limit for file and byte inputs passed to [`add`](Self::add).
    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Register `name`, returning its encoded audio.
    ///
    /// If the trimmed name is already registered the cached artifact is
    /// returned and `input` is neither decoded nor processed. Otherwise the
    /// processed entry is inserted and the store rewritten.
    ///
    /// # Errors
    /// - [`VoxcmdError::InvalidCommandName`] if `name` is blank.
    /// - Decode or processing errors from `input` and `processor`; the
    ///   registry is left unchanged.
    /// - [`VoxcmdError::PersistFailed`] if the store could not be written.
    ///   The new entry stays registered in memory.
    pub fn add<P: ClipProcessor + ?Sized>(
        &mut self,
        name: &str,
        input: AudioInput,
        processor: &mut P,
    ) -> Result<EncodedArtifact> {
        let name = normalize_name(name)?;

        if let Some(entry) = self.get(name) {
            debug!(name, "Command already registered");
            return Ok(entry.artifact.clone());
        }

        let buffer = input.into_pcm(self.max_upload_bytes)?;
        let processed = processor.process(buffer)?;
        let artifact = processed.artifact.clone();

        self.insert(CommandEntry {
            name: name.to_string(),
            clip: processed.pcm,
            artifact: processed.artifact,
        });
        info!(name, bytes = artifact.len(), "Added command");

        self.persist()?;
        Ok(artifact)
    }

    /// Remove `name` if present and rewrite the store either way.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        let removed = match self.index.remove(name) {
            Some(position) => {
                self.entries.remove(position);
                for slot in self.index.values_mut() {
                    if *slot > position {
                        *slot -= 1;
                    }
                }
                true
            }
            None => false,
        };

        if removed {
            info!(name, "Removed command");
        } else {
            debug!(name, "Remove of unknown command");
        }

        self.persist()?;
        Ok(removed)
    }

    /// Look up a command by name. Surrounding whitespace is ignored.
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.index
            .get(name.trim())
            .and_then(|&position| self.entries.get(position))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Write every entry to the store.
    pub fn persist(&mut self) -> Result<()> {
        let mut document = StoredCommands::new();
        for entry in &self.entries {
            document.insert(
                entry.name.clone(),
                StoredClip {
                    sample_rate: Some(entry.clip.sample_rate),
                    samples: entry.clip.samples.clone(),
                },
            );
        }

        self.store.save(&document).inspect_err(|e| {
            warn!("Command registry not persisted: {}", e);
        })
    }

    fn insert(&mut self, entry: CommandEntry) {
        match self.index.get(&entry.name) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

fn normalize_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(VoxcmdError::InvalidCommandName)
    } else {
        Ok(trimmed)
    }
}
