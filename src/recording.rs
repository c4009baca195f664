//! Recording session state machine.
//!
//! A session owns one capture device. `start` acquires it and lets chunks
//! stream in over a channel; `stop` releases it, joins every chunk received
//! so far into one blob and decodes that into a [`PcmBuffer`].
//!
//! Sessions sharing a [`RecordingLock`] record one at a time. Sessions made
//! with [`RecordingSession::new`] share the process-wide lock.

use crate::audio::decode::ChunkDecoder;
use crate::audio::pcm::PcmBuffer;
use crate::audio::recorder::CaptureDevice;
use crate::error::{Result, VoxcmdError};
use crate::pipeline::{ClipProcessor, ProcessedClip};
use crossbeam_channel::{Receiver, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static PROCESS_LOCK: LazyLock<RecordingLock> = LazyLock::new(RecordingLock::new);

/// Allows at most one of the sessions holding a clone to record.
#[derive(Debug, Clone, Default)]
pub struct RecordingLock {
    active: Arc<AtomicBool>,
}

impl RecordingLock {
    /// A fresh lock, independent of every other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock shared by every session built with [`RecordingSession::new`].
    pub fn process_wide() -> Self {
        PROCESS_LOCK.clone()
    }

    pub fn is_held(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn try_claim(&self) -> Option<RecordingClaim> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RecordingClaim {
                active: Arc::clone(&self.active),
            })
    }
}

/// Held while a session records; released on drop.
#[derive(Debug)]
struct RecordingClaim {
    active: Arc<AtomicBool>,
}

impl Drop for RecordingClaim {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopping,
}

/// Manages recording from a single capture device.
pub struct RecordingSession<D: CaptureDevice> {
    device: D,
    decoder: Box<dyn ChunkDecoder>,
    state: SessionState,
    receiver: Option<Receiver<Vec<u8>>>,
    lock: RecordingLock,
    claim: Option<RecordingClaim>,
}

impl<D: CaptureDevice> RecordingSession<D> {
    /// Create an idle session decoding with the device's own chunk format.
    pub fn new(device: D) -> Self {
        let decoder = device.format().decoder();
        Self::with_decoder(device, decoder)
    }

    /// Create an idle session with an explicit decoder.
    pub fn with_decoder(device: D, decoder: Box<dyn ChunkDecoder>) -> Self {
        Self {
            device,
            decoder,
            state: SessionState::Idle,
            receiver: None,
            lock: RecordingLock::process_wide(),
            claim: None,
        }
    }

    /// Coordinate with the sessions sharing `lock` instead of the
    /// process-wide lock.
    pub fn with_lock(mut self, lock: RecordingLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Acquire the device and begin accepting chunks.
    ///
    /// # Errors
    /// - [`VoxcmdError::AlreadyRecording`] if this session or another one
    ///   sharing its lock is recording; the running capture is left
    ///   untouched.
    /// - [`VoxcmdError::CaptureUnavailable`] if the device cannot be
    ///   acquired; the session stays idle.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(VoxcmdError::AlreadyRecording);
        }
        let claim = self
            .lock
            .try_claim()
            .ok_or(VoxcmdError::AlreadyRecording)?;

        let (sender, receiver) = unbounded();
        self.device.open(sender).map_err(|e| match e {
            VoxcmdError::CaptureUnavailable { .. } => e,
            other => VoxcmdError::CaptureUnavailable {
                message: other.to_string(),
            },
        })?;

        self.receiver = Some(receiver);
        self.claim = Some(claim);
        self.state = SessionState::Recording;
        info!("Recording started");
        Ok(())
    }

    /// Release the device and decode everything received.
    ///
    /// The session is idle again afterwards whether or not decoding
    /// succeeded, and the received chunks are discarded either way.
    ///
    /// # Errors
    /// - [`VoxcmdError::NotRecording`] if no recording is in progress.
    /// - [`VoxcmdError::DecodeFailed`] if no audio arrived or the data is
    ///   corrupt.
    pub fn stop(&mut self) -> Result<PcmBuffer> {
        let blob = self.finish()?;
        debug!(bytes = blob.len(), "Decoding recording");
        let buffer = self.decoder.decode(&blob)?;
        if buffer.is_empty() {
            return Err(VoxcmdError::DecodeFailed {
                message: "recording contains no samples".to_string(),
            });
        }
        info!(
            samples = buffer.len(),
            sample_rate = buffer.sample_rate,
            "Recording stopped"
        );
        Ok(buffer)
    }

    /// Stop and run the result straight through `processor`.
    pub fn stop_and_process<P: ClipProcessor + ?Sized>(
        &mut self,
        processor: &mut P,
    ) -> Result<ProcessedClip> {
        let buffer = self.stop()?;
        processor.process(buffer)
    }

    /// Stop capturing and throw away everything received.
    pub fn cancel(&mut self) -> Result<()> {
        let blob = self.finish()?;
        debug!(bytes = blob.len(), "Recording cancelled");
        Ok(())
    }

    /// Close the device, drain the channel and return to idle.
    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.state != SessionState::Recording {
            return Err(VoxcmdError::NotRecording);
        }
        self.state = SessionState::Stopping;

        let close_result = self.device.close();
        let chunks = match self.receiver.take() {
            Some(receiver) => drain_chunks(&receiver),
            None => Vec::new(),
        };
        self.claim = None;
        self.state = SessionState::Idle;

        if let Err(e) = close_result {
            warn!("Capture device did not close cleanly: {}", e);
        }

        debug!(chunks = chunks.len(), "Collected recording chunks");
        Ok(chunks.concat())
    }
}

/// Collect every chunk currently queued, dropping empty ones.
fn drain_chunks(receiver: &Receiver<Vec<u8>>) -> Vec<Vec<u8>> {
    receiver
        .try_iter()
        .filter(|chunk| !chunk.is_empty())
        .collect()
}
