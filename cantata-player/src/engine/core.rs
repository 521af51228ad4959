//! Core playback loop: lifecycle, session start, and shutdown.
//!
//! The loop is strictly single-consumer: exactly one task reads the
//! command channel and mutates queue, state, and the session slot.
//! Sessions hold only the channel's producer end plus their own cancel
//! token; they report their outcome by posting `SessionEnded` back.

use crate::engine::commands::PlayerCommand;
use crate::error::{Error, Result};
use crate::listener::PlayerListener;
use crate::queue::TrackQueue;
use crate::session::{PauseGate, PlaybackSession};
use crate::sink::AudioSink;
use crate::source::AudioSource;
use crate::state::{ActiveSession, SharedState};
use cantata_common::config::PlaybackConfig;
use cantata_common::playback::{CurrentSessionInfo, PlaybackEndResult, PlayerState, RepeatMode};
use cantata_common::track::Track;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Public handle to the playback engine.
///
/// All command methods return as soon as the command is enqueued; their
/// effect is observable via state snapshots and listener callbacks.
pub struct Player {
    cmd_tx: mpsc::Sender<PlayerCommand>,
    queue: Arc<RwLock<TrackQueue>>,
    shared: Arc<SharedState>,
    cancel: CancellationToken,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Build the engine and spawn its command loop.
    ///
    /// Listeners are fixed at construction time and invoked from the loop
    /// task.
    pub fn new(
        source: Arc<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
        config: PlaybackConfig,
        listeners: Vec<Arc<dyn PlayerListener>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(RwLock::new(TrackQueue::new()));
        let shared = Arc::new(SharedState::new());
        let cancel = CancellationToken::new();

        let engine = PlayerEngine {
            cmd_rx,
            cmd_tx: cmd_tx.clone(),
            queue: queue.clone(),
            shared: shared.clone(),
            source,
            sink,
            listeners,
            cancel: cancel.clone(),
            supervisor: None,
        };
        let loop_handle = tokio::spawn(engine.run());

        Self {
            cmd_tx,
            queue,
            shared,
            cancel,
            loop_handle: Mutex::new(Some(loop_handle)),
        }
    }

    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.cmd_tx
            .send(command)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Append tracks to the pending queue.
    pub async fn enqueue_tracks(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(PlayerCommand::Enqueue(tracks)).await
    }

    /// Put a track at the front of the queue, pre-empting any current
    /// session.
    pub async fn play_now(&self, track: Track) -> Result<()> {
        self.send(PlayerCommand::PlayNow(track)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.send(PlayerCommand::Resume).await
    }

    pub async fn skip(&self) -> Result<()> {
        self.send(PlayerCommand::Skip).await
    }

    /// Empty the pending queue. Never affects the in-flight session.
    pub async fn clear(&self) -> Result<()> {
        self.send(PlayerCommand::Clear).await
    }

    /// Empty the queue, cancel the current session, and stop.
    pub async fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        *self.shared.repeat.write().await = mode;
    }

    pub async fn repeat_mode(&self) -> RepeatMode {
        *self.shared.repeat.read().await
    }

    pub fn set_shuffle(&self, enabled: bool) {
        self.shared.shuffle.store(enabled, Ordering::Relaxed);
    }

    pub fn shuffle(&self) -> bool {
        self.shared.shuffle_enabled()
    }

    pub async fn state(&self) -> PlayerState {
        self.shared.player_state().await
    }

    /// Consistent point-in-time copy of the pending queue.
    pub async fn queue_snapshot(&self) -> Vec<Track> {
        self.queue.read().await.snapshot()
    }

    /// Snapshot of the current session, if one is active.
    pub async fn current_session(&self) -> Option<CurrentSessionInfo> {
        self.shared.current_session().await
    }

    /// Cancel the loop and every session under it, then wait for the loop
    /// to finish its cleanup (including sink disposal).
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("playback loop task panicked: {e}");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(super) struct PlayerEngine {
    pub(super) cmd_rx: mpsc::Receiver<PlayerCommand>,
    pub(super) cmd_tx: mpsc::Sender<PlayerCommand>,
    pub(super) queue: Arc<RwLock<TrackQueue>>,
    pub(super) shared: Arc<SharedState>,
    pub(super) source: Arc<dyn AudioSource>,
    pub(super) sink: Arc<dyn AudioSink>,
    pub(super) listeners: Vec<Arc<dyn PlayerListener>>,
    pub(super) cancel: CancellationToken,
    /// Join handle of the most recently spawned session supervisor.
    pub(super) supervisor: Option<JoinHandle<()>>,
}

impl PlayerEngine {
    pub(super) async fn run(mut self) {
        debug!("playback loop started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                command = self.cmd_rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
        self.shutdown().await;
        debug!("playback loop ended");
    }

    /// Start the next queued track unless a session is already active.
    ///
    /// The session runs in a background supervisor task that clears the
    /// session slot and posts `SessionEnded` as its final acts, so a
    /// handled `SessionEnded` always observes an empty slot.
    pub(super) async fn try_start_next(&mut self) {
        if self.shared.current.read().await.is_some() {
            return;
        }

        let shuffle = self.shared.shuffle_enabled();
        let next = self.queue.write().await.dequeue_next(shuffle);
        self.notify_track_changed(next.as_ref());
        let Some(track) = next else {
            self.set_state(PlayerState::Idle).await;
            return;
        };
        self.set_state(PlayerState::Playing).await;

        let gate = PauseGate::new();
        let cancel = self.cancel.child_token();
        let session = PlaybackSession::new(
            track.clone(),
            self.source.clone(),
            self.sink.clone(),
            gate.clone(),
        );
        info!(session_id = %session.id(), uri = %track.uri, title = %track.title, "starting playback session");

        *self.shared.current.write().await = Some(ActiveSession {
            id: session.id(),
            track: track.clone(),
            started_at: chrono::Utc::now(),
            gate,
            cancel: cancel.clone(),
        });

        let shared = self.shared.clone();
        let cmd_tx = self.cmd_tx.clone();
        self.supervisor = Some(tokio::spawn(async move {
            let result = session.run(&cancel).await;
            // Slot is cleared before the end report is posted, so any
            // command that observes an idle player sees a clean slot.
            *shared.current.write().await = None;
            if cmd_tx
                .send(PlayerCommand::SessionEnded(track, result))
                .await
                .is_err()
            {
                debug!("player loop closed before session end report");
            }
        }));
    }

    /// Transition the state machine, notifying listeners only on actual
    /// change.
    pub(super) async fn set_state(&self, new_state: PlayerState) {
        let changed = {
            let mut state = self.shared.state.write().await;
            if *state == new_state {
                false
            } else {
                *state = new_state;
                true
            }
        };
        if changed {
            debug!(state = %new_state, "player state changed");
            for listener in &self.listeners {
                listener.on_state_changed(new_state);
            }
        }
    }

    pub(super) fn notify_track_changed(&self, track: Option<&Track>) {
        for listener in &self.listeners {
            listener.on_track_changed(track);
        }
    }

    pub(super) fn notify_session_ended(&self, track: &Track, result: &PlaybackEndResult) {
        for listener in &self.listeners {
            listener.on_session_ended(track, result);
        }
    }

    /// Loop teardown: cancel the active session, wait for its supervisor
    /// to unwind, then dispose the sink. The sink is only disposed here,
    /// never per track.
    async fn shutdown(&mut self) {
        if let Some(active) = self.shared.current.read().await.as_ref() {
            active.cancel.cancel();
        }
        if let Some(mut supervisor) = self.supervisor.take() {
            let mut rx_open = true;
            loop {
                if rx_open {
                    tokio::select! {
                        finished = &mut supervisor => {
                            if let Err(e) = finished {
                                error!("session supervisor panicked: {e}");
                            }
                            break;
                        }
                        // Drain late commands so the supervisor's end
                        // report can never block on a full channel.
                        command = self.cmd_rx.recv() => {
                            rx_open = command.is_some();
                        }
                    }
                } else {
                    if let Err(e) = (&mut supervisor).await {
                        error!("session supervisor panicked: {e}");
                    }
                    break;
                }
            }
        }
        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "sink close failed during shutdown");
        }
    }
}
