//! Authenticated control-API client and token persistence.
//!
//! This crate provides the JSON-over-HTTP client for the destination
//! platform's control API, with transparent refresh-on-expiry of the
//! bearer credential, plus the file-backed store for the token pair.

mod client;
mod endpoints;
mod error;
mod store;

pub use client::ApiClient;
pub use endpoints::{CreatedEvent, LastEventContext};
pub use error::{ApiError, TokenStoreError};
pub use store::{TokenPair, TokenStore};

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Default deadline in milliseconds applied to every control-API request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Path of the token refresh endpoint.
pub const REFRESH_ENDPOINT: &str = "/auth/v1/token/refresh/";
