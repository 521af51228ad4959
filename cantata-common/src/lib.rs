//! # Cantata Common Library
//!
//! Shared code for the Cantata playback framework:
//! - Track and request models
//! - Playback state and session-outcome types
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod playback;
pub mod track;

pub use error::{Error, Result};
