//! Upstream liveness monitoring.
//!
//! Polls the source's live manifest over HTTP and decides whether the
//! source is still broadcasting. A missing manifest (404) is the
//! authoritative end-of-broadcast signal; every other failure is
//! transient and absorbed.

mod manifest;
mod monitor;

pub use manifest::has_segment_references;
pub use monitor::{LivenessMonitor, MonitorConfig};

/// Default milliseconds between manifest polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Default deadline in milliseconds for a single manifest fetch.
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 10_000;
