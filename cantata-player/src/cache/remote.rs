//! HTTP key-value cache client.
//!
//! Talks to a remote KV service: `GET ?key=` returns the JSON track list
//! (404 on miss), `PUT ?key=&ttl_secs=` stores one. Like every cache
//! backend this is best-effort; callers log failures and move on.

use crate::cache::RequestCache;
use crate::error::{Error, Result};
use async_trait::async_trait;
use cantata_common::track::Track;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteCache {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCache {
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Cache(format!("http client init failed: {e}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RequestCache for RemoteCache {
    async fn try_get(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Track>>> {
        let request = self.client.get(&self.base_url).query(&[("key", key)]).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request => {
                response.map_err(|e| Error::Cache(format!("cache lookup failed: {e}")))?
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| Error::Cache(format!("cache lookup failed: {e}")))?;
        let tracks = response
            .json::<Vec<Track>>()
            .await
            .map_err(|e| Error::Cache(format!("cache payload unparsable: {e}")))?;
        Ok(Some(tracks))
    }

    async fn set(
        &self,
        key: &str,
        tracks: &[Track],
        ttl: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request = self
            .client
            .put(&self.base_url)
            .query(&[("key", key), ("ttl_secs", &ttl.as_secs().to_string())])
            .json(tracks)
            .send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = request => {
                response.map_err(|e| Error::Cache(format!("cache store failed: {e}")))?
            }
        };
        response
            .error_for_status()
            .map_err(|e| Error::Cache(format!("cache store failed: {e}")))?;
        Ok(())
    }
}
