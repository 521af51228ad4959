//! Track resolution: a raw user request → zero-or-more tracks.
//!
//! "No results" is an empty sequence, never an error; failures inside a
//! resolver surface to the user as an empty list with a warning log.

mod local;
mod remote;

pub use local::LocalFileResolver;
pub use remote::{RemoteResolver, DEFAULT_METADATA_FETCH_LIMIT};

use crate::error::Result;
use async_trait::async_trait;
use cantata_common::track::{Track, TrackRequest};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Finite lazy sequence of resolved tracks.
pub type TrackStream = BoxStream<'static, Track>;

#[async_trait]
pub trait TrackResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap routing predicate; no I/O.
    fn can_resolve(&self, request: &TrackRequest) -> bool;

    async fn resolve(
        &self,
        request: &TrackRequest,
        cancel: &CancellationToken,
    ) -> Result<TrackStream>;
}

/// Composite resolver delegating to the first member whose `can_resolve`
/// accepts the request.
pub struct RoutingResolver {
    resolvers: Vec<Arc<dyn TrackResolver>>,
}

impl RoutingResolver {
    pub fn new(resolvers: Vec<Arc<dyn TrackResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl TrackResolver for RoutingResolver {
    fn name(&self) -> &str {
        "routing"
    }

    fn can_resolve(&self, request: &TrackRequest) -> bool {
        self.resolvers.iter().any(|r| r.can_resolve(request))
    }

    async fn resolve(
        &self,
        request: &TrackRequest,
        cancel: &CancellationToken,
    ) -> Result<TrackStream> {
        for resolver in &self.resolvers {
            if resolver.can_resolve(request) {
                return resolver.resolve(request, cancel).await;
            }
        }
        warn!(request = %request.raw, "no resolver accepts request");
        Ok(stream::empty().boxed())
    }
}
