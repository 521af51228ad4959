//! Shared test doubles for playback loop tests: scripted sources, a
//! recording sink, and an event-collecting listener.

use async_trait::async_trait;
use cantata_common::playback::{PlaybackEndReason, PlaybackEndResult, PlayerState};
use cantata_common::track::Track;
use cantata_player::error::{Error, Result};
use cantata_player::listener::PlayerListener;
use cantata_player::sink::AudioSink;
use cantata_player::source::{AudioSource, PcmReader};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Per-track behavior of a [`ScriptedSource`].
#[derive(Debug, Clone, Copy)]
pub enum TrackScript {
    /// Serve this many zero bytes, then EOF.
    Bytes(usize),
    /// Never produce data; unwind only on cancellation.
    Block,
    /// Fail the first read as a pipeline error.
    Fail { process: &'static str, code: i32 },
}

/// Source whose readers follow a per-URI script.
pub struct ScriptedSource {
    scripts: HashMap<String, TrackScript>,
}

impl ScriptedSource {
    pub fn new(scripts: impl IntoIterator<Item = (String, TrackScript)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AudioSource for ScriptedSource {
    async fn open_reader(
        &self,
        track: &Track,
        _cancel: &CancellationToken,
    ) -> Result<Box<dyn PcmReader>> {
        let script = self
            .scripts
            .get(&track.uri)
            .copied()
            .unwrap_or(TrackScript::Bytes(0));
        let remaining = match script {
            TrackScript::Bytes(n) => n,
            _ => 0,
        };
        Ok(Box::new(ScriptedReader { script, remaining }))
    }
}

struct ScriptedReader {
    script: TrackScript,
    remaining: usize,
}

#[async_trait]
impl PcmReader for ScriptedReader {
    async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        match self.script {
            TrackScript::Bytes(_) => {
                let n = self.remaining.min(buf.len());
                self.remaining -= n;
                Ok(n)
            }
            TrackScript::Block => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            TrackScript::Fail { process, code } => Err(Error::PipelineFailed {
                process: process.to_string(),
                code,
            }),
        }
    }

    async fn close(&mut self) {}
}

/// Sink that records byte counts without pacing.
#[derive(Default)]
pub struct RecordingSink {
    pub bytes: AtomicUsize,
    pub completes: AtomicUsize,
    pub closes: AtomicUsize,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn write(&self, buf: &[u8], _cancel: &CancellationToken) -> Result<()> {
        self.bytes.fetch_add(buf.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn complete(&self, _cancel: &CancellationToken) -> Result<()> {
        self.completes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything a listener can observe, flattened for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventRecord {
    State(PlayerState),
    Track(Option<String>),
    Ended {
        uri: String,
        reason: PlaybackEndReason,
        details: Option<String>,
    },
}

/// Listener forwarding every callback into a channel.
pub struct EventLog {
    tx: mpsc::UnboundedSender<PlayerEventRecord>,
}

impl EventLog {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlayerEventRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PlayerListener for EventLog {
    fn on_state_changed(&self, state: PlayerState) {
        let _ = self.tx.send(PlayerEventRecord::State(state));
    }

    fn on_track_changed(&self, track: Option<&Track>) {
        let _ = self
            .tx
            .send(PlayerEventRecord::Track(track.map(|t| t.uri.clone())));
    }

    fn on_session_ended(&self, track: &Track, result: &PlaybackEndResult) {
        let _ = self.tx.send(PlayerEventRecord::Ended {
            uri: track.uri.clone(),
            reason: result.reason,
            details: result.details.clone(),
        });
    }
}

/// Receive the next event or fail the test after five seconds.
pub async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<PlayerEventRecord>,
) -> PlayerEventRecord {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for player event")
        .expect("event channel closed")
}

/// Receive events until `predicate` matches, returning everything seen in
/// order (the matching event last).
pub async fn events_until(
    rx: &mut mpsc::UnboundedReceiver<PlayerEventRecord>,
    predicate: impl Fn(&PlayerEventRecord) -> bool,
) -> Vec<PlayerEventRecord> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let done = predicate(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}
