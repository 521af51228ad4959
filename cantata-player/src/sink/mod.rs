//! Audio sink interfaces.
//!
//! A sink consumes raw PCM in whatever buffer sizes the session chooses
//! and guarantees the downstream output receives bytes no faster than
//! real time.

mod paced;

pub use paced::{PacedSink, MAX_PACING_DELAY, PCM_BYTES_PER_SECOND, STALL_RESET_THRESHOLD};

use crate::error::Result;
use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

/// Consumer of raw PCM frames.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Forward PCM bytes downstream. An empty buffer is a no-op.
    async fn write(&self, buf: &[u8], cancel: &CancellationToken) -> Result<()>;

    /// End-of-track flush. Resets any pacing state so the next track
    /// starts fresh.
    async fn complete(&self, cancel: &CancellationToken) -> Result<()>;

    /// Release the underlying output. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Provider of the sink's underlying output stream, opened lazily on the
/// first write.
#[async_trait]
pub trait OutputProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;
}
