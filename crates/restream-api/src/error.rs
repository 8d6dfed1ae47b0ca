//! Error types for the API crate.

use thiserror::Error;

/// Errors from the token store.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// No persisted token pair exists.
    #[error("token file not found; provide initial tokens")]
    NotFound,

    /// The persisted pair cannot be parsed.
    #[error("token file is corrupt: {0}")]
    Corrupt(String),

    /// Filesystem error.
    #[error("token file IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the authenticated API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request deadline expired.
    #[error("API request timed out")]
    Timeout,

    /// Transport-level failure.
    #[error("HTTP transport error: {0}")]
    Http(reqwest::Error),

    /// Non-2xx response.
    #[error("API request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Raw response body.
        body: String,
    },

    /// A retried request was rejected again after a refresh.
    #[error("access token rejected after refresh; re-authentication required")]
    AuthExpired,

    /// The refresh call itself failed. Always fatal to the session.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// Token persistence failed.
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    /// Response body was not the expected JSON shape.
    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}
