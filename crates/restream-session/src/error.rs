//! Error types for the session orchestrator.

use thiserror::Error;

/// Errors that end a session in the Failed state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token pair absent or unreadable.
    #[error(transparent)]
    TokenStore(#[from] restream_api::TokenStoreError),

    /// A control-API call failed fatally.
    #[error(transparent)]
    Api(#[from] restream_api::ApiError),

    /// The relay process could not be managed.
    #[error(transparent)]
    Process(#[from] restream_process::ProcessError),

    /// The relay process died while the source was still live.
    #[error("relay process exited unexpectedly with code {code:?}")]
    RelayExited {
        /// Process exit code (`None` when killed by a signal).
        code: Option<i32>,
    },
}
