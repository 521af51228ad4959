//! Track model shared by the player, resolvers, and caches.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a track's bytes come from, and therefore which audio source opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackInputKind {
    /// A file on the local filesystem, decoded directly.
    LocalFile,
    /// A remote URL fetched and decoded through the two-process pipeline.
    Remote,
}

impl std::fmt::Display for TrackInputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackInputKind::LocalFile => write!(f, "local_file"),
            TrackInputKind::Remote => write!(f, "remote"),
        }
    }
}

/// Immutable description of one playable track.
///
/// Queue deduplication and `PlayNow` replacement use `uri` as identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Location the audio source opens (file path or remote URL).
    pub uri: String,
    /// Human-readable title.
    pub title: String,
    /// Routing discriminator for the audio source.
    pub input_kind: TrackInputKind,
    /// Advisory duration from metadata, when known.
    pub duration_hint: Option<Duration>,
}

impl Track {
    /// Build a track backed by a local file.
    pub fn local(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            input_kind: TrackInputKind::LocalFile,
            duration_hint: None,
        }
    }

    /// Build a track backed by a remote URL.
    pub fn remote(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
            input_kind: TrackInputKind::Remote,
            duration_hint: None,
        }
    }

    /// Attach a duration hint from resolved metadata.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_hint = Some(duration);
        self
    }
}

/// Raw user request before resolution into zero-or-more tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    /// Opaque user string (URL, ID, or file path).
    pub raw: String,
    /// Optional advisory routing hint.
    pub input_hint: Option<TrackInputKind>,
}

impl TrackRequest {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            input_hint: None,
        }
    }

    pub fn with_hint(raw: impl Into<String>, hint: TrackInputKind) -> Self {
        Self {
            raw: raw.into(),
            input_hint: Some(hint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_builders_set_input_kind() {
        let local = Track::local("/music/a.flac", "A");
        assert_eq!(local.input_kind, TrackInputKind::LocalFile);
        assert!(local.duration_hint.is_none());

        let remote = Track::remote("https://example.com/watch?v=abc", "B")
            .with_duration(Duration::from_secs(212));
        assert_eq!(remote.input_kind, TrackInputKind::Remote);
        assert_eq!(remote.duration_hint, Some(Duration::from_secs(212)));
    }

    #[test]
    fn track_serializes_round_trip() {
        let track = Track::remote("https://example.com/watch?v=abc", "Song")
            .with_duration(Duration::from_secs(180));
        let json = serde_json::to_string(&track).expect("serialize");
        let back: Track = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, track);
    }

    #[test]
    fn request_hint_is_optional() {
        let plain = TrackRequest::new("abc123xyz_0");
        assert!(plain.input_hint.is_none());

        let hinted = TrackRequest::with_hint("abc123xyz_0", TrackInputKind::Remote);
        assert_eq!(hinted.input_hint, Some(TrackInputKind::Remote));
    }
}
