//! Local-file audio source: one decoder child process reading the file
//! directly and emitting raw PCM on its standard output.

use crate::error::{Error, Result};
use crate::source::{AudioSource, PcmReader};
use async_trait::async_trait;
use cantata_common::config::DecoderConfig;
use cantata_common::track::Track;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct LocalFileSource {
    decoder: DecoderConfig,
}

impl LocalFileSource {
    pub fn new(decoder: DecoderConfig) -> Self {
        Self { decoder }
    }
}

#[async_trait]
impl AudioSource for LocalFileSource {
    async fn open_reader(
        &self,
        track: &Track,
        _cancel: &CancellationToken,
    ) -> Result<Box<dyn PcmReader>> {
        let path = Path::new(&track.uri);
        if tokio::fs::metadata(path).await.is_err() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let mut command = Command::new(&self.decoder.path);
        command
            .args(decoder_args(&self.decoder, &track.uri))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|e| Error::Spawn {
            program: self.decoder.path.clone(),
            source: e,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Source("decoder stdout not captured".to_string()))?;

        debug!(path = %track.uri, decoder = %self.decoder.path, "decoder started");
        Ok(Box::new(DecoderReader {
            child,
            stdout,
            exit_checked: false,
        }))
    }
}

/// Argument list for a decoder invocation reading `input` and writing raw
/// PCM to stdout.
pub(crate) fn decoder_args(config: &DecoderConfig, input: &str) -> Vec<String> {
    let mut args = Vec::new();
    if config.hide_banner {
        args.push("-hide_banner".to_string());
    }
    args.push("-loglevel".to_string());
    args.push(config.log_level.clone());
    args.push("-i".to_string());
    args.push(input.to_string());
    args.push("-f".to_string());
    args.push(config.sample_format.clone());
    args.push("-ac".to_string());
    args.push(config.channels.to_string());
    args.push("-ar".to_string());
    args.push(config.sample_rate.to_string());
    args.push("pipe:1".to_string());
    args
}

struct DecoderReader {
    child: Child,
    stdout: ChildStdout,
    exit_checked: bool,
}

#[async_trait]
impl PcmReader for DecoderReader {
    async fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        let n = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = self.stdout.read(buf) => read?,
        };
        if n == 0 && !self.exit_checked {
            self.exit_checked = true;
            let status = self.child.wait().await?;
            if let Some(code) = status.code() {
                if code != 0 {
                    return Err(Error::PipelineFailed {
                        process: "decoder".to_string(),
                        code,
                    });
                }
            }
        }
        Ok(n)
    }

    async fn close(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("decoder already exited: {e}");
        }
    }
}
