//! Common error types for Cantata

use thiserror::Error;

/// Common result type for Cantata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across Cantata crates
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
