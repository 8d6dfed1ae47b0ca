//! Relay process supervision.
//!
//! Wraps the external media-relay tool as an opaque long-running child
//! process with a start / observe / stop contract. The supervisor never
//! restarts a relay on its own; retry policy belongs to the caller.

mod error;
mod supervisor;

pub use error::ProcessError;
pub use supervisor::{ExitResult, RelayHandle, RelayStatus, RelaySupervisor};

/// Result type for supervisor operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Default grace period in milliseconds before an unresponsive relay is killed.
pub const DEFAULT_STOP_GRACE_MS: u64 = 5_000;
