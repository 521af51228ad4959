//! Playback state and session-outcome types.

use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Player state machine.
///
/// `Playing` and `Paused` imply an active session; `Idle` and `Stopped`
/// imply none. The initial state is `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl PlayerState {
    /// States in which no session exists and a new one may start.
    pub fn is_startable(&self) -> bool {
        matches!(self, PlayerState::Idle | PlayerState::Stopped)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Queue repeat policy applied when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    /// Re-enqueue the ended track at the front so it plays again next.
    One,
    /// Re-enqueue the ended track at the tail of the queue.
    All,
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::None => write!(f, "none"),
            RepeatMode::One => write!(f, "one"),
            RepeatMode::All => write!(f, "all"),
        }
    }
}

/// Why a playback session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackEndReason {
    /// The source reached end-of-stream and the sink was flushed.
    Completed,
    /// The session was pre-empted (skip, play-now, stop, shutdown).
    Cancelled,
    /// A source, sink, or pipeline error terminated the session.
    Failed,
}

impl std::fmt::Display for PlaybackEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackEndReason::Completed => write!(f, "completed"),
            PlaybackEndReason::Cancelled => write!(f, "cancelled"),
            PlaybackEndReason::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal outcome of one playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEndResult {
    pub reason: PlaybackEndReason,
    /// Failure details (exit codes, error messages); `None` otherwise.
    pub details: Option<String>,
}

impl PlaybackEndResult {
    pub fn completed() -> Self {
        Self {
            reason: PlaybackEndReason::Completed,
            details: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            reason: PlaybackEndReason::Cancelled,
            details: None,
        }
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            reason: PlaybackEndReason::Failed,
            details: Some(details.into()),
        }
    }
}

/// Read-only snapshot of the current session, derived on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSessionInfo {
    pub track: Track,
    pub state: PlayerState,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
