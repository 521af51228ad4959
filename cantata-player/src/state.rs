//! Shared player state.
//!
//! The loop task is the only writer of `state` and `current`; API callers
//! take read-only snapshots from any task.

use crate::session::PauseGate;
use cantata_common::playback::{CurrentSessionInfo, PlayerState, RepeatMode};
use cantata_common::track::Track;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The loop's record of the one active session.
pub(crate) struct ActiveSession {
    pub id: Uuid,
    pub track: Track,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub gate: PauseGate,
    pub cancel: CancellationToken,
}

pub(crate) struct SharedState {
    pub state: RwLock<PlayerState>,
    pub current: RwLock<Option<ActiveSession>>,
    pub repeat: RwLock<RepeatMode>,
    pub shuffle: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PlayerState::Idle),
            current: RwLock::new(None),
            repeat: RwLock::new(RepeatMode::default()),
            shuffle: AtomicBool::new(false),
        }
    }

    pub async fn player_state(&self) -> PlayerState {
        *self.state.read().await
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle.load(Ordering::Relaxed)
    }

    /// Read-only snapshot of the current session, if any.
    pub async fn current_session(&self) -> Option<CurrentSessionInfo> {
        let state = self.player_state().await;
        self.current.read().await.as_ref().map(|active| CurrentSessionInfo {
            track: active.track.clone(),
            state,
            started_at: active.started_at,
        })
    }
}
