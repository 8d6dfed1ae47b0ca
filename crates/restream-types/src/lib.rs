//! Shared types for the relay session orchestrator.
//!
//! This crate defines the session data model, the state machine states,
//! and the event notifications exchanged between the orchestrator and
//! its observers.

mod events;
mod state;
mod types;

pub use events::{SessionEvent, SessionOutcome};
pub use state::{LivenessState, SessionState};
pub use types::{
    DeviceInfo, EventSpec, RelayProfile, Session, SessionConfig, DEFAULT_CHECK_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STOP_GRACE_MS,
};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Creates an unbounded event channel (Orchestrator → observer).
pub fn event_channel() -> (UnboundedSender<SessionEvent>, UnboundedReceiver<SessionEvent>) {
    unbounded_channel()
}
