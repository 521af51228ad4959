//! Error types for the playback engine.
//!
//! Cancellation is modelled as its own variant: it is a cooperative,
//! clean unwind and must never be logged or reported as a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the playback engine
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local source fail-fast when the requested file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A child process could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit from a pipeline child process
    #[error("{process} exited with code {code}")]
    PipelineFailed { process: String, code: i32 },

    /// Audio source read error mid-stream
    #[error("Source error: {0}")]
    Source(String),

    /// Audio sink write or flush error
    #[error("Sink error: {0}")]
    Sink(String),

    /// Track resolution error
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Request cache backend error (best-effort; callers log and continue)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Disk-backed cache database error
    #[error("Cache database error: {0}")]
    CacheDatabase(#[from] sqlx::Error),

    /// Metadata JSON parse error
    #[error("Metadata parse error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation; a clean unwind, never a failure
    #[error("operation cancelled")]
    Cancelled,

    /// The player command channel is closed (player shut down)
    #[error("player command channel closed")]
    ChannelClosed,
}

impl Error {
    /// Whether this error is a cooperative cancellation unwind.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
