//! Player commands and their handlers.
//!
//! All mutation is serial: the loop handles exactly one command at a
//! time, in enqueue order. No handler performs long-running work; that
//! belongs to the session task.

use crate::engine::core::PlayerEngine;
use cantata_common::playback::{PlaybackEndReason, PlaybackEndResult, PlayerState, RepeatMode};
use cantata_common::track::Track;
use tracing::{debug, info};

/// Commands consumed by the playback loop.
///
/// `SessionEnded` is produced internally by the session supervisor; the
/// rest originate from the public API.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Append tracks to the queue, starting playback if idle.
    Enqueue(Vec<Track>),
    /// Dedup the track out of the queue, front-insert it, and pre-empt
    /// any current session.
    PlayNow(Track),
    /// Cancel the current session; the next one starts when its end
    /// report arrives.
    Skip,
    Pause,
    Resume,
    /// Empty the pending queue without touching the current session.
    Clear,
    /// Empty the queue and cancel the current session.
    Stop,
    /// Terminal report posted by a session supervisor.
    SessionEnded(Track, PlaybackEndResult),
}

impl PlayerEngine {
    pub(super) async fn handle(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Enqueue(tracks) => self.handle_enqueue(tracks).await,
            PlayerCommand::PlayNow(track) => self.handle_play_now(track).await,
            PlayerCommand::Skip => self.handle_skip().await,
            PlayerCommand::Pause => self.handle_pause().await,
            PlayerCommand::Resume => self.handle_resume().await,
            PlayerCommand::Clear => self.handle_clear().await,
            PlayerCommand::Stop => self.handle_stop().await,
            PlayerCommand::SessionEnded(track, result) => {
                self.handle_session_ended(track, result).await
            }
        }
    }

    async fn handle_enqueue(&mut self, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }
        debug!(count = tracks.len(), "enqueueing tracks");
        self.queue.write().await.append_many(tracks);
        if self.shared.player_state().await.is_startable() {
            self.try_start_next().await;
        }
    }

    async fn handle_play_now(&mut self, track: Track) {
        debug!(uri = %track.uri, "play-now requested");
        {
            let mut queue = self.queue.write().await;
            queue.remove_where_id(&track.uri);
            queue.push_front(track);
        }

        let state = self.shared.player_state().await;
        let active_cancel = self
            .shared
            .current
            .read()
            .await
            .as_ref()
            .map(|active| active.cancel.clone());
        match active_cancel {
            Some(cancel) if !state.is_startable() => {
                // Pre-empt. The incoming SessionEnded drives the next
                // start, so the old session's cleanup completes first.
                cancel.cancel();
            }
            _ => self.try_start_next().await,
        }
    }

    async fn handle_skip(&mut self) {
        if let Some(active) = self.shared.current.read().await.as_ref() {
            debug!(uri = %active.track.uri, "skipping current session");
            active.cancel.cancel();
        }
        // The next start is driven by the session's end report.
    }

    async fn handle_pause(&mut self) {
        if self.shared.player_state().await != PlayerState::Playing {
            return;
        }
        let gate = self
            .shared
            .current
            .read()
            .await
            .as_ref()
            .map(|active| active.gate.clone());
        let Some(gate) = gate else { return };
        gate.close();
        self.set_state(PlayerState::Paused).await;
    }

    async fn handle_resume(&mut self) {
        if self.shared.player_state().await != PlayerState::Paused {
            return;
        }
        let gate = self
            .shared
            .current
            .read()
            .await
            .as_ref()
            .map(|active| active.gate.clone());
        let Some(gate) = gate else { return };
        gate.open();
        self.set_state(PlayerState::Playing).await;
    }

    async fn handle_clear(&mut self) {
        debug!("clearing pending queue");
        self.queue.write().await.clear();
    }

    async fn handle_stop(&mut self) {
        debug!("stopping playback");
        self.queue.write().await.clear();
        if let Some(active) = self.shared.current.read().await.as_ref() {
            active.cancel.cancel();
        }
        self.set_state(PlayerState::Stopped).await;
    }

    async fn handle_session_ended(&mut self, track: Track, result: PlaybackEndResult) {
        info!(uri = %track.uri, reason = %result.reason, "session ended");
        self.notify_session_ended(&track, &result);

        // Cancellation implies user intent to move on; only completed or
        // failed tracks participate in repeat.
        if result.reason != PlaybackEndReason::Cancelled {
            match *self.shared.repeat.read().await {
                RepeatMode::All => self.queue.write().await.append_many([track]),
                RepeatMode::One => self.queue.write().await.push_front(track),
                RepeatMode::None => {}
            }
        }

        if self.queue.read().await.is_empty() {
            self.set_state(PlayerState::Idle).await;
        } else {
            self.try_start_next().await;
        }
    }
}
