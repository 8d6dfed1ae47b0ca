//! Error types for the process supervisor.

use thiserror::Error;

/// Errors that can occur while supervising the relay process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Relay tool could not be launched.
    #[error("failed to spawn relay process: {0}")]
    Spawn(std::io::Error),

    /// Ingest target is not a valid URL.
    #[error("invalid ingest target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    /// Waiting on or signalling the relay process failed.
    #[error("relay process IO error: {0}")]
    Io(#[from] std::io::Error),
}
