//! Error types for roomcast-server
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for roomcast-server
#[derive(Error, Debug)]
pub enum Error {
    /// Remote source fetch/poll or forwarded request failed.
    ///
    /// Recovered locally: the scheduler emits a safe idle snapshot rather
    /// than propagating this to subscribers.
    #[error("Source adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// A capture session was started while one is already running
    #[error("Capture session already active")]
    UpstreamActive,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the common crate
    #[error(transparent)]
    Common(#[from] roomcast_common::Error),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using roomcast-server Error
pub type Result<T> = std::result::Result<T, Error>;
