//! Remote metadata resolver.
//!
//! Parses the raw request into a video or playlist target, consults the
//! request cache, and on a miss invokes the fetcher child process in
//! JSON-dump mode. Cache failures are logged and never raised; a
//! non-zero fetcher exit yields an empty track list (a warning, not an
//! error). Concurrent metadata fetches are bounded by a counting
//! semaphore.

use crate::cache::RequestCache;
use crate::error::{Error, Result};
use crate::resolver::{TrackResolver, TrackStream};
use crate::source::remote::fetcher_cookie_args;
use async_trait::async_trait;
use cantata_common::config::FetcherConfig;
use cantata_common::track::{Track, TrackInputKind, TrackRequest};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cap on concurrent fetcher invocations used for metadata.
pub const DEFAULT_METADATA_FETCH_LIMIT: usize = 4;

/// What a raw request points at on the remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RemoteTarget {
    Video(String),
    Playlist(String),
}

impl RemoteTarget {
    fn cache_key(&self) -> String {
        match self {
            RemoteTarget::Video(id) => format!("remote:video:{id}"),
            RemoteTarget::Playlist(id) => format!("remote:playlist:{id}:raw"),
        }
    }
}

pub struct RemoteResolver {
    fetcher: FetcherConfig,
    cache: Arc<dyn RequestCache>,
    cache_ttl: Duration,
    fetch_permits: Arc<Semaphore>,
}

impl RemoteResolver {
    pub fn new(
        fetcher: FetcherConfig,
        cache: Arc<dyn RequestCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            cache,
            cache_ttl,
            fetch_permits: Arc::new(Semaphore::new(DEFAULT_METADATA_FETCH_LIMIT)),
        }
    }

    /// Run the fetcher in JSON-dump mode and parse its output.
    async fn fetch_dump(&self, raw: &str, cancel: &CancellationToken) -> Result<MetadataDump> {
        let _permit = self
            .fetch_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Resolver("metadata fetch semaphore closed".to_string()))?;

        let mut command = Command::new(&self.fetcher.path);
        command.arg("-J").arg("--no-warnings");
        for arg in fetcher_cookie_args(&self.fetcher) {
            command.arg(arg);
        }
        command
            .arg(raw)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|e| Error::Spawn {
            program: self.fetcher.path.clone(),
            source: e,
        })?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Resolver("fetcher stdout not captured".to_string()))?;

        let mut output = Vec::new();
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(Error::Cancelled);
            }
            read = stdout.read_to_end(&mut output) => { read?; }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::PipelineFailed {
                process: "fetcher".to_string(),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(serde_json::from_slice(&output)?)
    }
}

#[async_trait]
impl TrackResolver for RemoteResolver {
    fn name(&self) -> &str {
        "remote"
    }

    fn can_resolve(&self, request: &TrackRequest) -> bool {
        parse_remote_target(request).is_some()
    }

    async fn resolve(
        &self,
        request: &TrackRequest,
        cancel: &CancellationToken,
    ) -> Result<TrackStream> {
        let Some(target) = parse_remote_target(request) else {
            return Ok(stream::empty().boxed());
        };
        let key = target.cache_key();

        match self.cache.try_get(&key, cancel).await {
            Ok(Some(tracks)) => {
                debug!(key = %key, count = tracks.len(), "metadata cache hit");
                return Ok(stream::iter(tracks).boxed());
            }
            Ok(None) => {}
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => warn!(key = %key, error = %e, "cache lookup failed"),
        }

        let tracks = match self.fetch_dump(&request.raw, cancel).await {
            Ok(dump) => dump_to_tracks(&request.raw, dump),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(Error::PipelineFailed { process, code }) => {
                warn!(%process, code, request = %request.raw, "metadata fetch failed, no results");
                Vec::new()
            }
            Err(Error::Metadata(e)) => {
                warn!(error = %e, request = %request.raw, "metadata dump unparsable, no results");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        if !tracks.is_empty() {
            if let Err(e) = self.cache.set(&key, &tracks, self.cache_ttl, cancel).await {
                if !e.is_cancelled() {
                    warn!(key = %key, error = %e, "cache store failed");
                }
            }
        }
        Ok(stream::iter(tracks).boxed())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataDump {
    title: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    entries: Option<Vec<MetadataEntry>>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    id: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
}

fn dump_to_tracks(raw: &str, dump: MetadataDump) -> Vec<Track> {
    match dump.entries {
        Some(entries) => entries
            .into_iter()
            .filter_map(|entry| {
                let uri = entry.webpage_url.or(entry.url).or(entry.id)?;
                let mut track = Track::remote(
                    uri,
                    entry.title.unwrap_or_else(|| "Unknown".to_string()),
                );
                if let Some(secs) = entry.duration {
                    track = track.with_duration(Duration::from_secs_f64(secs));
                }
                Some(track)
            })
            .collect(),
        None => {
            let uri = dump.webpage_url.unwrap_or_else(|| raw.to_string());
            let mut track = Track::remote(
                uri,
                dump.title.unwrap_or_else(|| "Unknown".to_string()),
            );
            if let Some(secs) = dump.duration {
                track = track.with_duration(Duration::from_secs_f64(secs));
            }
            vec![track]
        }
    }
}

/// Parse a raw request into a remote target.
///
/// URLs are recognised by their `v`/`list` query parameters or a
/// single-segment short-link path; bare IDs are accepted only when the
/// input hint asserts the remote site.
pub(crate) fn parse_remote_target(request: &TrackRequest) -> Option<RemoteTarget> {
    let raw = request.raw.trim();
    if raw.contains("://") {
        if let Some(id) = query_param(raw, "v").filter(|id| is_valid_media_id(id)) {
            return Some(RemoteTarget::Video(id));
        }
        if let Some(id) = query_param(raw, "list").filter(|id| is_valid_media_id(id)) {
            return Some(RemoteTarget::Playlist(id));
        }
        return short_link_id(raw).map(RemoteTarget::Video);
    }
    if request.input_hint == Some(TrackInputKind::Remote) && is_valid_media_id(raw) {
        return Some(RemoteTarget::Video(raw.to_string()));
    }
    None
}

fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?').map(|(_, q)| q)?;
    let query = query.split('#').next().unwrap_or(query);
    for pair in query.split('&') {
        if let Some((k, v)) = pair.split_once('=') {
            if k == key && !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Short-link form: a single path segment after the host is the video id.
fn short_link_id(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, rest)| rest)?;
    let path = rest.split(&['?', '#'][..]).next().unwrap_or(rest);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let _host = segments.next()?;
    let candidate = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    is_valid_media_id(candidate).then(|| candidate.to_string())
}

fn is_valid_media_id(s: &str) -> bool {
    (6..=64).contains(&s.len())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn watch_url_parses_as_video() {
        let request = TrackRequest::new("https://example.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            parse_remote_target(&request),
            Some(RemoteTarget::Video("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn video_wins_over_list_on_combined_urls() {
        let request =
            TrackRequest::new("https://example.com/watch?v=dQw4w9WgXcQ&list=PL0123456789");
        assert_eq!(
            parse_remote_target(&request),
            Some(RemoteTarget::Video("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn playlist_url_parses_as_playlist() {
        let request = TrackRequest::new("https://example.com/playlist?list=PL0123456789");
        assert_eq!(
            parse_remote_target(&request),
            Some(RemoteTarget::Playlist("PL0123456789".to_string()))
        );
    }

    #[test]
    fn short_link_parses_as_video() {
        let request = TrackRequest::new("https://exmpl.be/dQw4w9WgXcQ?t=30");
        assert_eq!(
            parse_remote_target(&request),
            Some(RemoteTarget::Video("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn bare_id_requires_remote_hint() {
        let bare = TrackRequest::new("dQw4w9WgXcQ");
        assert_eq!(parse_remote_target(&bare), None);

        let hinted = TrackRequest::with_hint("dQw4w9WgXcQ", TrackInputKind::Remote);
        assert_eq!(
            parse_remote_target(&hinted),
            Some(RemoteTarget::Video("dQw4w9WgXcQ".to_string()))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_remote_target(&TrackRequest::new("not a url")), None);
        assert_eq!(
            parse_remote_target(&TrackRequest::new("https://example.com/a/b/c")),
            None
        );
        assert_eq!(
            parse_remote_target(&TrackRequest::with_hint(
                "has spaces in it",
                TrackInputKind::Remote
            )),
            None
        );
    }

    #[test]
    fn cache_keys_are_stable() {
        assert_eq!(
            RemoteTarget::Video("abc123".to_string()).cache_key(),
            "remote:video:abc123"
        );
        assert_eq!(
            RemoteTarget::Playlist("PL1".to_string()).cache_key(),
            "remote:playlist:PL1:raw"
        );
    }

    #[test]
    fn single_video_dump_builds_one_track() {
        let dump: MetadataDump = serde_json::from_str(
            r#"{
                "title": "A Song",
                "duration": 212.5,
                "webpage_url": "https://example.com/watch?v=abc123"
            }"#,
        )
        .expect("parse");
        let tracks = dump_to_tracks("https://example.com/watch?v=abc123", dump);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "A Song");
        assert_eq!(tracks[0].uri, "https://example.com/watch?v=abc123");
        assert_eq!(tracks[0].input_kind, TrackInputKind::Remote);
        assert_eq!(
            tracks[0].duration_hint,
            Some(Duration::from_secs_f64(212.5))
        );
    }

    #[test]
    fn playlist_dump_builds_tracks_from_entries() {
        let dump: MetadataDump = serde_json::from_str(
            r#"{
                "title": "Mix",
                "entries": [
                    {"id": "one123", "title": "One", "duration": 60.0},
                    {"url": "https://example.com/watch?v=two456", "title": "Two"},
                    {"title": "no id, dropped"}
                ]
            }"#,
        )
        .expect("parse");
        let tracks = dump_to_tracks("https://example.com/playlist?list=PL1", dump);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].uri, "one123");
        assert_eq!(tracks[1].uri, "https://example.com/watch?v=two456");
    }

    struct PresetCache {
        tracks: Vec<Track>,
    }

    #[async_trait]
    impl RequestCache for PresetCache {
        async fn try_get(
            &self,
            _key: &str,
            _cancel: &CancellationToken,
        ) -> Result<Option<Vec<Track>>> {
            Ok(Some(self.tracks.clone()))
        }

        async fn set(
            &self,
            _key: &str,
            _tracks: &[Track],
            _ttl: Duration,
            _cancel: &CancellationToken,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn cache_hit_skips_the_fetcher() {
        let cached = vec![Track::remote("https://example.com/watch?v=abc123", "Hit")];
        let resolver = RemoteResolver::new(
            FetcherConfig {
                // Unspawnable on purpose: a cache hit must never get here.
                path: "/nonexistent/fetcher".to_string(),
                ..FetcherConfig::default()
            },
            Arc::new(PresetCache {
                tracks: cached.clone(),
            }),
            Duration::from_secs(60),
        );

        let request = TrackRequest::new("https://example.com/watch?v=abc123");
        let tracks: Vec<Track> = resolver
            .resolve(&request, &CancellationToken::new())
            .await
            .expect("resolve")
            .collect()
            .await;
        assert_eq!(tracks, cached);
    }
}
