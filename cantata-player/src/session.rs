//! One track's playback session: the source→sink copy loop with a pause
//! gate and a cancellation signal.
//!
//! Pause and cancel are deliberately separate primitives: the gate holds
//! the next loop iteration while resources stay alive, the token unwinds
//! the session promptly regardless of pause state.

use crate::error::{Error, Result};
use crate::sink::AudioSink;
use crate::source::AudioSource;
use cantata_common::playback::PlaybackEndResult;
use cantata_common::track::Track;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Bytes requested from the source per iteration.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Binary condition the session's write loop awaits while paused.
///
/// Closing the gate never cancels an in-flight read or write; it only
/// holds the next iteration.
#[derive(Clone)]
pub struct PauseGate {
    open: Arc<watch::Sender<bool>>,
}

impl PauseGate {
    /// Create an open gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { open: Arc::new(tx) }
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    /// Wait until the gate is open or the session is cancelled.
    pub async fn wait_open(&self, cancel: &CancellationToken) -> Result<()> {
        let mut rx = self.open.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                changed = rx.changed() => {
                    if changed.is_err() {
                        // Gate dropped; nothing left to wait for.
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one track end-to-end through the source→sink pipeline.
pub struct PlaybackSession {
    id: Uuid,
    track: Track,
    source: Arc<dyn AudioSource>,
    sink: Arc<dyn AudioSink>,
    gate: PauseGate,
}

impl PlaybackSession {
    pub fn new(
        track: Track,
        source: Arc<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
        gate: PauseGate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            track,
            source,
            sink,
            gate,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Run the session to its terminal outcome. Never panics upward:
    /// every error is folded into the returned result.
    pub async fn run(&self, cancel: &CancellationToken) -> PlaybackEndResult {
        match self.stream(cancel).await {
            Ok(()) => PlaybackEndResult::completed(),
            Err(Error::Cancelled) => {
                debug!(session_id = %self.id, track = %self.track.uri, "session cancelled");
                PlaybackEndResult::cancelled()
            }
            Err(e) => {
                warn!(session_id = %self.id, track = %self.track.uri, error = %e, "session failed");
                PlaybackEndResult::failed(e.to_string())
            }
        }
    }

    async fn stream(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut reader = self.source.open_reader(&self.track, cancel).await?;
        let mut buf = vec![0u8; READ_CHUNK_SIZE];

        let mut outcome: Result<()> = Ok(());
        loop {
            if let Err(e) = self.gate.wait_open(cancel).await {
                outcome = Err(e);
                break;
            }
            let n = match reader.read(&mut buf, cancel).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            };
            if let Err(e) = self.sink.write(&buf[..n], cancel).await {
                outcome = Err(e);
                break;
            }
            if cancel.is_cancelled() {
                outcome = Err(Error::Cancelled);
                break;
            }
        }
        reader.close().await;
        outcome?;

        self.sink.complete(cancel).await?;
        Ok(())
    }
}
