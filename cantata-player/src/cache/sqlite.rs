//! Disk-backed request cache over SQLite.
//!
//! One table, `request_cache(key, payload, expires_at)`, with the track
//! list stored as a JSON payload. Expired rows are deleted lazily on
//! lookup and can be pruned in bulk.

use crate::cache::RequestCache;
use crate::error::{Error, Result};
use async_trait::async_trait;
use cantata_common::track::Track;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if missing) the cache database and its table.
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS request_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        debug!(path = %path.display(), "request cache database ready");
        Ok(Self { pool })
    }

    /// Delete every expired row; returns the number removed.
    pub async fn prune_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM request_cache WHERE expires_at <= ?")
            .bind(now_epoch())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl RequestCache for SqliteCache {
    async fn try_get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Track>>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT payload, expires_at FROM request_cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((payload, expires_at)) = row else {
            return Ok(None);
        };
        if expires_at <= now_epoch() {
            sqlx::query("DELETE FROM request_cache WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let tracks: Vec<Track> = serde_json::from_str(&payload)?;
        Ok(Some(tracks))
    }

    async fn set(
        &self,
        key: &str,
        tracks: &[Track],
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let payload = serde_json::to_string(tracks)?;
        let expires_at = now_epoch() + ttl.as_secs() as i64;
        sqlx::query(
            "INSERT OR REPLACE INTO request_cache (key, payload, expires_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_cache() -> (SqliteCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = SqliteCache::connect(&dir.path().join("cache.db"))
            .await
            .expect("connect");
        (cache, dir)
    }

    fn tracks() -> Vec<Track> {
        vec![Track::remote("https://example.com/watch?v=abc123", "Song")
            .with_duration(Duration::from_secs(180))]
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (cache, _dir) = temp_cache().await;
        let cancel = CancellationToken::new();

        cache
            .set("remote:video:abc123", &tracks(), Duration::from_secs(600), &cancel)
            .await
            .expect("set");
        let hit = cache
            .try_get("remote:video:abc123", &cancel)
            .await
            .expect("get");
        assert_eq!(hit, Some(tracks()));
    }

    #[tokio::test]
    async fn zero_ttl_entries_are_already_expired() {
        let (cache, _dir) = temp_cache().await;
        let cancel = CancellationToken::new();

        cache
            .set("key", &tracks(), Duration::ZERO, &cancel)
            .await
            .expect("set");
        assert!(cache.try_get("key", &cancel).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn prune_removes_expired_rows_only() {
        let (cache, _dir) = temp_cache().await;
        let cancel = CancellationToken::new();

        cache
            .set("stale", &tracks(), Duration::ZERO, &cancel)
            .await
            .expect("set stale");
        cache
            .set("fresh", &tracks(), Duration::from_secs(600), &cancel)
            .await
            .expect("set fresh");

        let removed = cache.prune_expired().await.expect("prune");
        assert_eq!(removed, 1);
        assert!(cache.try_get("fresh", &cancel).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn cancelled_lookup_unwinds_clean() {
        let (cache, _dir) = temp_cache().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cache.try_get("key", &cancel).await.expect_err("cancelled");
        assert!(err.is_cancelled());
    }
}
