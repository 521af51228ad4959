//! Real-time pacing sink.
//!
//! The downstream voice stream has no back-pressure: writing faster than
//! real time silently drops frames there. The sink therefore converts the
//! fixed byte-rate contract (48 kHz × 16-bit × 2 channels = 192 000 B/s)
//! into wall-clock delays after each write. Gaps longer than
//! [`STALL_RESET_THRESHOLD`] reset the pacing baseline so pause/resume
//! never fast-forwards accumulated audio, and a single delay is clamped
//! below [`MAX_PACING_DELAY`].

use crate::error::{Error, Result};
use crate::sink::{AudioSink, OutputProvider};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// 48 000 Hz × 2 channels × 2 bytes per sample.
pub const PCM_BYTES_PER_SECOND: u64 = 192_000;

/// Gap between writes beyond which the pacing baseline resets instead of
/// catching up.
pub const STALL_RESET_THRESHOLD: Duration = Duration::from_secs(1);

/// Upper clamp on a single pacing delay; anything this large is a clock
/// reset race, not real scheduling debt.
pub const MAX_PACING_DELAY: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Pacing {
    clock_start: Option<Instant>,
    bytes_sent: u64,
    last_write_at: Option<Instant>,
}

enum OutputSlot {
    Unopened,
    Open(Box<dyn AsyncWrite + Send + Unpin>),
    Closed,
}

struct Inner {
    slot: OutputSlot,
    pacing: Pacing,
}

/// [`AudioSink`] implementation pacing writes into a lazily-opened
/// output stream.
pub struct PacedSink {
    provider: Box<dyn OutputProvider>,
    inner: Mutex<Inner>,
}

impl PacedSink {
    pub fn new(provider: Box<dyn OutputProvider>) -> Self {
        Self {
            provider,
            inner: Mutex::new(Inner {
                slot: OutputSlot::Unopened,
                pacing: Pacing::default(),
            }),
        }
    }
}

#[async_trait]
impl AudioSink for PacedSink {
    async fn write(&self, buf: &[u8], cancel: &CancellationToken) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        let delay = {
            let mut inner = self.inner.lock().await;

            let now = Instant::now();
            let stalled = inner
                .pacing
                .last_write_at
                .is_some_and(|last| now.duration_since(last) > STALL_RESET_THRESHOLD);
            if inner.pacing.clock_start.is_none() || stalled {
                trace!(stalled, "pacing clock reset");
                inner.pacing.clock_start = Some(now);
                inner.pacing.bytes_sent = 0;
            }

            if matches!(inner.slot, OutputSlot::Closed) {
                return Err(Error::Sink("sink is closed".to_string()));
            }
            if matches!(inner.slot, OutputSlot::Unopened) {
                let stream = self.provider.open().await?;
                inner.slot = OutputSlot::Open(stream);
            }
            let OutputSlot::Open(stream) = &mut inner.slot else {
                return Err(Error::Sink("output unavailable".to_string()));
            };

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                written = stream.write_all(buf) => {
                    written.map_err(|e| Error::Sink(format!("write failed: {e}")))?;
                }
            }

            inner.pacing.bytes_sent += buf.len() as u64;
            let after = Instant::now();
            inner.pacing.last_write_at = Some(after);

            let clock_start = inner.pacing.clock_start.unwrap_or(after);
            let expected =
                Duration::from_millis(inner.pacing.bytes_sent * 1000 / PCM_BYTES_PER_SECOND);
            let delay = (clock_start + expected).saturating_duration_since(after);
            if delay >= MAX_PACING_DELAY {
                Duration::ZERO
            } else {
                delay
            }
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(())
    }

    async fn complete(&self, cancel: &CancellationToken) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let OutputSlot::Open(stream) = &mut inner.slot {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                flushed = stream.flush() => {
                    flushed.map_err(|e| Error::Sink(format!("flush failed: {e}")))?;
                }
            }
        }
        inner.pacing = Pacing::default();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let OutputSlot::Open(stream) = &mut inner.slot {
            let _ = stream.shutdown().await;
        }
        inner.slot = OutputSlot::Closed;
        Ok(())
    }
}
