//! Orchestrator → observer notifications.

use serde::{Deserialize, Serialize};

use crate::state::{LivenessState, SessionState};

/// Notifications emitted while a session runs.
///
/// Delivery is best-effort; a dropped receiver never affects the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// State machine moved.
    StateChanged {
        /// Previous state.
        previous: SessionState,

        /// New state.
        current: SessionState,
    },

    /// Destination event exists; the share link is available.
    EventCreated {
        /// Destination event code.
        code: String,

        /// Public link to the broadcast.
        shareable_url: String,
    },

    /// Relay process is up.
    RelayStarted {
        /// OS process id, if known.
        pid: Option<u32>,
    },

    /// First diagnostic line from the relay process. A weak signal that
    /// the relay has begun transmitting; never used for correctness.
    RelayOutput {
        /// The output line.
        line: String,
    },

    /// One upstream liveness check completed.
    Liveness {
        /// Classification of the check.
        state: LivenessState,

        /// Consecutive UNKNOWN checks so far (reset by ACTIVE).
        unknown_streak: u32,
    },

    /// Upstream manifest reported end-of-broadcast.
    UpstreamEnded,

    /// Relay process exited on its own.
    RelayExited {
        /// Process exit code (`None` when killed by a signal).
        code: Option<i32>,
    },

    /// Destination-side stop action finished.
    RemoteStop {
        /// Whether the stop action is known to have succeeded.
        ok: bool,
    },
}

/// Report returned when a session ends cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Destination event code of the finished broadcast.
    pub event_code: String,

    /// Public link to the finished broadcast.
    pub shareable_url: String,

    /// Result of the destination-side stop action, if one was attempted.
    pub remote_stop_ok: Option<bool>,
}
