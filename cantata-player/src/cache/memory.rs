//! In-memory TTL cache, lost on restart.

use crate::cache::RequestCache;
use crate::error::Result;
use async_trait::async_trait;
use cantata_common::track::Track;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct CacheEntry {
    expires_at: Instant,
    tracks: Vec<Track>,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestCache for MemoryCache {
    async fn try_get(
        &self,
        key: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<Vec<Track>>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.tracks.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        tracks: &[Track],
        ttl: Duration,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                expires_at: Instant::now() + ttl,
                tracks: tracks.to_vec(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> Vec<Track> {
        vec![
            Track::remote("https://example.com/watch?v=one123", "One"),
            Track::remote("https://example.com/watch?v=two456", "Two"),
        ]
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        let cancel = CancellationToken::new();

        cache
            .set("remote:video:one123", &tracks(), Duration::from_secs(60), &cancel)
            .await
            .expect("set");
        let hit = cache
            .try_get("remote:video:one123", &cancel)
            .await
            .expect("get");
        assert_eq!(hit, Some(tracks()));
    }

    #[tokio::test]
    async fn unknown_key_is_a_miss() {
        let cache = MemoryCache::new();
        let cancel = CancellationToken::new();
        let miss = cache.try_get("remote:video:nope", &cancel).await.expect("get");
        assert!(miss.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        let cancel = CancellationToken::new();

        cache
            .set("key", &tracks(), Duration::from_secs(30), &cancel)
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.try_get("key", &cancel).await.expect("get").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.try_get("key", &cancel).await.expect("get").is_none());
    }
}
