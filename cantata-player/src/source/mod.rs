//! Audio source interfaces and the routing composite.
//!
//! A source opens a PCM reader for a track. Output on the read side is
//! always raw signed 16-bit little-endian PCM at 48 kHz, 2 interleaved
//! channels; whatever fetching, decoding, or resampling is needed happens
//! upstream of the reader.

pub mod local;
pub mod remote;

pub use local::LocalFileSource;
pub use remote::{RemoteSource, PUMP_BUFFER_SIZE};

use crate::error::Result;
use async_trait::async_trait;
use cantata_common::track::{Track, TrackInputKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Byte-producing reader yielding raw PCM for one track.
#[async_trait]
pub trait PcmReader: Send {
    /// Read decoded PCM into `buf`. `Ok(0)` signals end-of-stream.
    async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize>;

    /// Release child processes and background tasks. Tolerates partial
    /// failures; always leaves the reader fully disposed.
    async fn close(&mut self);
}

/// Opens a PCM reader for a track.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn open_reader(
        &self,
        track: &Track,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn PcmReader>>;
}

/// Composite source that picks a concrete implementation by the track's
/// input kind.
pub struct RoutingSource {
    local: Arc<dyn AudioSource>,
    remote: Arc<dyn AudioSource>,
}

impl RoutingSource {
    pub fn new(local: Arc<dyn AudioSource>, remote: Arc<dyn AudioSource>) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl AudioSource for RoutingSource {
    async fn open_reader(
        &self,
        track: &Track,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn PcmReader>> {
        match track.input_kind {
            TrackInputKind::LocalFile => self.local.open_reader(track, cancel).await,
            TrackInputKind::Remote => self.remote.open_reader(track, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct TaggedSource(&'static str);

    struct TaggedReader(&'static str);

    #[async_trait]
    impl PcmReader for TaggedReader {
        async fn read(&mut self, _buf: &mut [u8], _cancel: &CancellationToken) -> Result<usize> {
            Err(Error::Source(self.0.to_string()))
        }

        async fn close(&mut self) {}
    }

    #[async_trait]
    impl AudioSource for TaggedSource {
        async fn open_reader(
            &self,
            _track: &Track,
            _cancel: &CancellationToken,
        ) -> Result<Box<dyn PcmReader>> {
            Ok(Box::new(TaggedReader(self.0)))
        }
    }

    async fn tag_of(reader: &mut dyn PcmReader) -> String {
        let cancel = CancellationToken::new();
        match reader.read(&mut [0u8; 1], &cancel).await {
            Err(Error::Source(tag)) => tag,
            other => panic!("unexpected read result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn routes_by_input_kind() {
        let routing = RoutingSource::new(
            Arc::new(TaggedSource("local")),
            Arc::new(TaggedSource("remote")),
        );
        let cancel = CancellationToken::new();

        let mut reader = routing
            .open_reader(&Track::local("/tmp/a.flac", "a"), &cancel)
            .await
            .expect("open local");
        assert_eq!(tag_of(reader.as_mut()).await, "local");

        let mut reader = routing
            .open_reader(&Track::remote("https://example.com/watch?v=abc", "b"), &cancel)
            .await
            .expect("open remote");
        assert_eq!(tag_of(reader.as_mut()).await, "remote");
    }
}
