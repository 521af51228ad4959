//! Pending-track queue.
//!
//! The queue itself is a plain ordered sequence: all mutation happens
//! inside the playback loop's single-consumer context, so no internal
//! locking is needed here. The loop wraps it in a shared lock so that
//! `snapshot` can be taken from any task.

use cantata_common::track::Track;
use rand::Rng;
use std::collections::VecDeque;

/// Ordered list of tracks waiting to play.
#[derive(Debug, Default)]
pub struct TrackQueue {
    entries: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append tracks at the tail, preserving their order.
    pub fn append_many(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.entries.extend(tracks);
    }

    /// Insert a track at the head so it plays next.
    pub fn push_front(&mut self, track: Track) {
        self.entries.push_front(track);
    }

    /// Remove every queued track whose `uri` matches.
    pub fn remove_where_id(&mut self, uri: &str) {
        self.entries.retain(|t| t.uri != uri);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the next track.
    ///
    /// Head of the queue when `shuffle` is false; a uniformly random
    /// entry when true.
    pub fn dequeue_next(&mut self, shuffle: bool) -> Option<Track> {
        if self.entries.is_empty() {
            return None;
        }
        if shuffle {
            let index = rand::thread_rng().gen_range(0..self.entries.len());
            self.entries.remove(index)
        } else {
            self.entries.pop_front()
        }
    }

    /// Consistent point-in-time copy of the pending tracks.
    pub fn snapshot(&self) -> Vec<Track> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
