//! Session state machine types.

use serde::{Deserialize, Serialize};

/// The lifecycle state of one relay session.
///
/// The orchestrator is the single writer. Transitions are one-directional;
/// no state is revisited, although `Monitoring` loops internally while the
/// upstream source is polled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// Session created, nothing done yet.
    #[default]
    Init,

    /// Token pair loaded and usable.
    Authenticated,

    /// Destination event created and ingest credentials retrieved.
    EventCreated,

    /// Relay process launched.
    RelayStarted,

    /// Destination event flipped live.
    Live,

    /// Watching the relay process and the upstream source.
    Monitoring,

    /// Tearing the session down.
    Stopping,

    /// Source ended and teardown completed.
    Stopped,

    /// Session ended in an error.
    Failed {
        /// User-visible terminating reason.
        reason: String,
    },
}

impl SessionState {
    /// Returns true if the session has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed { .. })
    }

    /// Returns true if the session failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Authenticated => "Authenticated",
            Self::EventCreated => "EventCreated",
            Self::RelayStarted => "RelayStarted",
            Self::Live => "Live",
            Self::Monitoring => "Monitoring",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// Classification of one upstream liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessState {
    /// The manifest still references media segments.
    Active,

    /// The manifest is gone; the source has ended.
    Ended,

    /// The check could not decide (transient error, empty playlist).
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Stopped.is_terminal());
        assert!(SessionState::Failed {
            reason: "x".to_string()
        }
        .is_terminal());
        assert!(!SessionState::Monitoring.is_terminal());
        assert!(!SessionState::Init.is_terminal());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::Init.name(), "Init");
        assert_eq!(
            SessionState::Failed {
                reason: "x".to_string()
            }
            .name(),
            "Failed"
        );
    }
}
