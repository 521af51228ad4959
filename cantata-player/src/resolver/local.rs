//! Local-path resolver: an existing file becomes a single track.

use crate::error::Result;
use crate::resolver::{TrackResolver, TrackStream};
use async_trait::async_trait;
use cantata_common::track::{Track, TrackInputKind, TrackRequest};
use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct LocalFileResolver;

#[async_trait]
impl TrackResolver for LocalFileResolver {
    fn name(&self) -> &str {
        "local_file"
    }

    fn can_resolve(&self, request: &TrackRequest) -> bool {
        match request.input_hint {
            Some(TrackInputKind::LocalFile) => true,
            Some(TrackInputKind::Remote) => false,
            None => Path::new(&request.raw).is_file(),
        }
    }

    async fn resolve(
        &self,
        request: &TrackRequest,
        _cancel: &CancellationToken,
    ) -> Result<TrackStream> {
        let path = Path::new(&request.raw);
        if tokio::fs::metadata(path).await.is_err() {
            warn!(path = %request.raw, "local file not found, no results");
            return Ok(stream::empty().boxed());
        }

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.raw.clone());
        let track = Track::local(request.raw.clone(), title);
        Ok(stream::iter(vec![track]).boxed())
    }
}
