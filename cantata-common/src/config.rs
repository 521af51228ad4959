//! Configuration loading for the playback framework.
//!
//! Resolution priority:
//! 1. Explicit path passed by the caller (highest priority)
//! 2. `CANTATA_CONFIG` environment variable
//! 3. Platform config directory (`<config dir>/cantata/config.toml`)
//!
//! A missing file is not fatal: compiled defaults apply with a warning.
//! An empty decoder or fetcher path is fatal and prevents startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "CANTATA_CONFIG";

/// Default bound on the player command channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Top-level player configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub decoder: DecoderConfig,
    pub fetcher: FetcherConfig,
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
    pub playback: PlaybackConfig,
}

/// Decoder child process (ffmpeg-compatible) options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Executable path or name looked up on `PATH`.
    pub path: String,
    pub hide_banner: bool,
    pub log_level: String,
    /// Raw output sample format passed to the decoder.
    pub sample_format: String,
    pub channels: u8,
    pub sample_rate: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            path: "ffmpeg".to_string(),
            hide_banner: true,
            log_level: "error".to_string(),
            sample_format: "s16le".to_string(),
            channels: 2,
            sample_rate: 48_000,
        }
    }
}

/// Fetcher child process (yt-dlp-compatible) options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Executable path or name looked up on `PATH`.
    pub path: String,
    pub use_cookies: bool,
    /// Browser profile to lift cookies from, when `use_cookies` is set.
    pub cookies_from_browser: Option<String>,
    /// Cookie jar file, when `use_cookies` is set and no browser is given.
    pub cookies_file: Option<PathBuf>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            path: "yt-dlp".to_string(),
            use_cookies: false,
            cookies_from_browser: None,
            cookies_file: None,
        }
    }
}

/// Track resolver options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Metadata cache time-to-live, in seconds.
    pub cache_ttl_secs: u64,
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
        }
    }
}

/// Request cache backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CacheConfig {
    /// In-process map, lost on restart.
    Memory,
    /// HTTP key-value service.
    Remote { url: String },
    /// Disk-backed database file.
    Sqlite { path: PathBuf },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory
    }
}

/// Playback loop options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Bound on the single-consumer command channel.
    pub queue_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PlayerConfig {
    /// Load configuration following the priority chain in the module docs.
    ///
    /// A missing file yields compiled defaults with a warning; a present
    /// but malformed file is a configuration error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => {
                warn!("no config file found, using compiled defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a specific TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid config file {}: {}", path.display(), e)))
    }

    /// Reject configurations that cannot start the player.
    pub fn validate(&self) -> Result<()> {
        if self.decoder.path.trim().is_empty() {
            return Err(Error::Config("decoder path must not be empty".to_string()));
        }
        if self.fetcher.path.trim().is_empty() {
            return Err(Error::Config("fetcher path must not be empty".to_string()));
        }
        if self.playback.queue_capacity == 0 {
            return Err(Error::Config(
                "playback queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        let default = dirs::config_dir().map(|d| d.join("cantata").join("config.toml"))?;
        default.exists().then_some(default)
    }
}
