//! Observer hooks invoked by the playback loop.
//!
//! Listeners are registered at player construction time and called
//! synchronously from the loop task, fire-and-forget. Implementations
//! must be quick and must not block.

use cantata_common::playback::{PlaybackEndResult, PlayerState};
use cantata_common::track::Track;

pub trait PlayerListener: Send + Sync {
    /// Called only when the player state actually changes.
    fn on_state_changed(&self, _state: PlayerState) {}

    /// Called at each dequeue attempt, including when nothing could be
    /// dequeued.
    fn on_track_changed(&self, _track: Option<&Track>) {}

    /// Called when a session reaches its terminal outcome, before the
    /// loop decides what to play next.
    fn on_session_ended(&self, _track: &Track, _result: &PlaybackEndResult) {}
}
