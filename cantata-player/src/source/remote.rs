//! Remote audio source: a fetcher child (URL → container bytes) piped
//! into a decoder child (container → raw PCM) by a background byte pump.
//!
//! Disposal order: pump-cancel, pump-await, decoder-kill, fetcher-kill,
//! each step tolerating failures in prior steps.

use crate::error::{Error, Result};
use crate::source::local::decoder_args;
use crate::source::{AudioSource, PcmReader};
use async_trait::async_trait;
use cantata_common::config::{DecoderConfig, FetcherConfig};
use cantata_common::track::Track;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Copy-buffer size for the fetcher→decoder pump.
pub const PUMP_BUFFER_SIZE: usize = 80 * 1024;

pub struct RemoteSource {
    decoder: DecoderConfig,
    fetcher: FetcherConfig,
}

impl RemoteSource {
    pub fn new(decoder: DecoderConfig, fetcher: FetcherConfig) -> Self {
        Self { decoder, fetcher }
    }
}

#[async_trait]
impl AudioSource for RemoteSource {
    async fn open_reader(
        &self,
        track: &Track,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn PcmReader>> {
        let mut fetch_command = Command::new(&self.fetcher.path);
        fetch_command
            .args(fetch_args(&self.fetcher, &track.uri))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        let mut fetcher = fetch_command.spawn().map_err(|e| Error::Spawn {
            program: self.fetcher.path.clone(),
            source: e,
        })?;
        let fetch_stdout = fetcher
            .stdout
            .take()
            .ok_or_else(|| Error::Source("fetcher stdout not captured".to_string()))?;

        let mut decode_command = Command::new(&self.decoder.path);
        decode_command
            .args(decoder_args(&self.decoder, "pipe:0"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        let mut decoder = match decode_command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let _ = fetcher.kill().await;
                return Err(Error::Spawn {
                    program: self.decoder.path.clone(),
                    source: e,
                });
            }
        };
        let decode_stdin = decoder
            .stdin
            .take()
            .ok_or_else(|| Error::Source("decoder stdin not captured".to_string()))?;
        let decode_stdout = decoder
            .stdout
            .take()
            .ok_or_else(|| Error::Source("decoder stdout not captured".to_string()))?;

        let pump_cancel = cancel.child_token();
        let pump = tokio::spawn(pump(fetch_stdout, decode_stdin, pump_cancel.clone()));

        debug!(uri = %track.uri, "remote pipeline started");
        Ok(Box::new(PipelineReader {
            fetcher,
            decoder,
            stdout: decode_stdout,
            pump: Some(pump),
            pump_cancel,
            exit_checked: false,
        }))
    }
}

/// Cookie-related fetcher arguments, shared with the metadata resolver.
pub(crate) fn fetcher_cookie_args(config: &FetcherConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.use_cookies {
        if let Some(browser) = &config.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        } else if let Some(file) = &config.cookies_file {
            args.push("--cookies".to_string());
            args.push(file.display().to_string());
        }
    }
    args
}

fn fetch_args(config: &FetcherConfig, uri: &str) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        "bestaudio".to_string(),
        "-o".to_string(),
        "-".to_string(),
        "--no-warnings".to_string(),
        "--no-progress".to_string(),
    ];
    args.extend(fetcher_cookie_args(config));
    args.push(uri.to_string());
    args
}

/// Copies fetcher output into the decoder until EOF or cancellation, then
/// closes the decoder's stdin so it can flush and exit.
async fn pump<R, W>(mut from: R, mut to: W, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; PUMP_BUFFER_SIZE];
    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => break,
            read = from.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!("pump read ended: {e}");
                    break;
                }
            },
        };
        let written = tokio::select! {
            _ = cancel.cancelled() => break,
            written = to.write_all(&buf[..n]) => written,
        };
        if let Err(e) = written {
            debug!("pump write ended: {e}");
            break;
        }
    }
    let _ = to.shutdown().await;
}

struct PipelineReader {
    fetcher: Child,
    decoder: Child,
    stdout: ChildStdout,
    pump: Option<JoinHandle<()>>,
    pump_cancel: CancellationToken,
    exit_checked: bool,
}

impl PipelineReader {
    /// A zero read with a non-zero exit on either child is a pipeline
    /// failure; the fetcher is checked first since it is the root cause
    /// when both fail.
    async fn check_exits(&mut self) -> Result<()> {
        if let Ok(Some(status)) = self.fetcher.try_wait() {
            if let Some(code) = status.code() {
                if code != 0 {
                    return Err(Error::PipelineFailed {
                        process: "fetcher".to_string(),
                        code,
                    });
                }
            }
        }
        let status = self.decoder.wait().await?;
        if let Some(code) = status.code() {
            if code != 0 {
                return Err(Error::PipelineFailed {
                    process: "decoder".to_string(),
                    code,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PcmReader for PipelineReader {
    async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        let n = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = self.stdout.read(buf) => read?,
        };
        if n == 0 && !self.exit_checked {
            self.exit_checked = true;
            self.check_exits().await?;
        }
        Ok(n)
    }

    async fn close(&mut self) {
        self.pump_cancel.cancel();
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        if let Err(e) = self.decoder.kill().await {
            debug!("decoder already exited: {e}");
        }
        if let Err(e) = self.fetcher.kill().await {
            debug!("fetcher already exited: {e}");
        }
    }
}
