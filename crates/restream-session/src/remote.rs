//! Destination-side stop collaborator.

use async_trait::async_trait;

use restream_types::Session;

/// Performs the destination platform's out-of-band stop action (e.g.
/// driving the platform UI).
///
/// The orchestrator invokes this best-effort, only after the upstream
/// source has ended and the relay process has been told to stop. A
/// `false` return is logged, never escalated: the authoritative fact
/// (source ended) has already been handled.
#[async_trait]
pub trait RemoteStopAgent: Send + Sync {
    /// Attempt to stop the destination broadcast. Returns whether the
    /// action is known to have succeeded.
    async fn stop_remote_broadcast(&self, session: &Session) -> bool;
}
