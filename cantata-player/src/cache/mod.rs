//! Request cache: best-effort key → track-list storage with TTL.
//!
//! The cache is advisory. Every failure is swallowed and logged by the
//! caller; no cache error ever reaches the user.

mod memory;
mod remote;
mod sqlite;

pub use memory::MemoryCache;
pub use remote::RemoteCache;
pub use sqlite::SqliteCache;

use crate::error::Result;
use async_trait::async_trait;
use cantata_common::config::CacheConfig;
use cantata_common::track::Track;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait RequestCache: Send + Sync {
    /// Look a key up, honouring its TTL. `Ok(None)` is a miss.
    async fn try_get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Track>>>;

    /// Store a track list under a key for `ttl`. At-most-once,
    /// best-effort; no durability is guaranteed.
    async fn set(
        &self,
        key: &str,
        tracks: &[Track],
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Build the cache backend selected by configuration.
pub async fn from_config(config: &CacheConfig) -> Result<Arc<dyn RequestCache>> {
    match config {
        CacheConfig::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheConfig::Remote { url } => Ok(Arc::new(RemoteCache::new(url.clone())?)),
        CacheConfig::Sqlite { path } => Ok(Arc::new(SqliteCache::connect(path).await?)),
    }
}
