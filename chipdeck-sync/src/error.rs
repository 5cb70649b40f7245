//! Error types for chipdeck-sync
//!
//! Engine reads are infallible and never produce these. Errors come from
//! configuration and from supervising session tasks.

use thiserror::Error;

/// Main error type for chipdeck-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared chipdeck-common crate
    #[error(transparent)]
    Common(#[from] chipdeck_common::Error),

    /// A session task failed or could not be joined
    #[error("Session error: {0}")]
    Session(String),
}

/// Convenience Result type using chipdeck-sync Error
pub type Result<T> = std::result::Result<T, Error>;
