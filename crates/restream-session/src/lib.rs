//! Relay session orchestration.
//!
//! Composes the token store, control-API client, relay process
//! supervisor, and liveness monitor into one session lifecycle:
//! authenticate, create remote event, start relay, go live, monitor,
//! stop.

mod error;
mod orchestrator;
mod remote;

pub use error::SessionError;
pub use orchestrator::Orchestrator;
pub use remote::RemoteStopAgent;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
