//! The relay session state machine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, instrument, warn};

use restream_api::{ApiClient, TokenStore};
use restream_liveness::{LivenessMonitor, MonitorConfig};
use restream_process::{ExitResult, RelaySupervisor};
use restream_types::{Session, SessionConfig, SessionEvent, SessionOutcome, SessionState};

use crate::error::SessionError;
use crate::remote::RemoteStopAgent;
use crate::SessionResult;

/// What ended the monitoring race.
enum MonitorExit {
    /// Relay process terminated on its own.
    RelayExited(ExitResult),

    /// Liveness monitor decided the source ended.
    SourceEnded,
}

/// Drives one relay session from authentication to teardown.
///
/// Owns the session aggregate exclusively; the observable state is
/// single-writer and one-directional.
pub struct Orchestrator {
    config: SessionConfig,
    remote_stop: Option<Arc<dyn RemoteStopAgent>>,
    state: Arc<RwLock<SessionState>>,
    event_tx: Option<UnboundedSender<SessionEvent>>,
}

impl Orchestrator {
    /// Create an orchestrator for one session. No I/O happens here.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            remote_stop: None,
            state: Arc::new(RwLock::new(SessionState::Init)),
            event_tx: None,
        }
    }

    /// Install the destination-side stop collaborator.
    pub fn with_remote_stop(mut self, agent: Arc<dyn RemoteStopAgent>) -> Self {
        self.remote_stop = Some(agent);
        self
    }

    /// Install an event sender for observers.
    pub fn with_event_sender(mut self, event_tx: UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Current observable state.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Run the full session lifecycle.
    ///
    /// Returns the outcome of a clean teardown; any error leaves the
    /// session in the Failed state with the terminating reason.
    #[instrument(name = "session_run", skip(self))]
    pub async fn run(&mut self) -> SessionResult<SessionOutcome> {
        match self.drive().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "session failed");
                self.transition(SessionState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> SessionResult<SessionOutcome> {
        // Init -> Authenticated: no tokens, no session.
        let store = TokenStore::new(&self.config.tokens_path);
        let pair = store.load()?;
        let api = ApiClient::with_timeout(
            &self.config.api_base_url,
            store,
            pair,
            self.config.device.clone(),
            Duration::from_millis(self.config.request_timeout_ms),
        )?;
        self.transition(SessionState::Authenticated);

        // Authenticated -> EventCreated: dependent call chain; any
        // failure here is fatal (there is no event to relay into).
        let session = self.create_event(&api).await?;
        self.transition(SessionState::EventCreated);
        self.emit(SessionEvent::EventCreated {
            code: session.event_code.clone(),
            shareable_url: session.shareable_url.clone(),
        });

        // EventCreated -> RelayStarted.
        let mut supervisor = RelaySupervisor::with_stop_grace(Duration::from_millis(
            self.config.profile.stop_grace_ms,
        ));
        if let Some(event_tx) = &self.event_tx {
            supervisor = supervisor.with_event_sender(event_tx.clone());
        }
        let mut handle = supervisor.start(
            &session.upstream_url,
            &session.ingest_target,
            &self.config.profile,
        )?;
        self.transition(SessionState::RelayStarted);
        self.emit(SessionEvent::RelayStarted { pid: handle.pid() });

        // RelayStarted -> Live: only after the relay is up; a live event
        // with no media flowing is worse than a delayed announcement.
        if let Err(e) = api.go_live(&session.event_code).await {
            error!(error = %e, "go-live call failed, stopping relay");
            if let Err(stop_err) = handle.stop().await {
                warn!(error = %stop_err, "relay did not stop cleanly");
            }
            return Err(e.into());
        }
        self.transition(SessionState::Live);
        info!(url = %session.shareable_url, "destination event is live");

        // Live -> Monitoring: race the relay process against the source.
        // Whichever side finishes first cancels the other.
        self.transition(SessionState::Monitoring);
        let mut monitor = LivenessMonitor::new(MonitorConfig {
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            check_timeout: Duration::from_millis(self.config.check_timeout_ms),
            max_unknown_checks: self.config.max_unknown_checks,
        });
        if let Some(event_tx) = &self.event_tx {
            monitor = monitor.with_event_sender(event_tx.clone());
        }
        let exit = tokio::select! {
            exit = handle.wait() => MonitorExit::RelayExited(exit?),
            () = monitor.run_until_ended(&session.upstream_url) => MonitorExit::SourceEnded,
        };

        self.transition(SessionState::Stopping);
        match exit {
            MonitorExit::RelayExited(exit) => {
                // Unexpected termination while the source was still live.
                // No automatic restart: resuming mid-stream risks corrupt
                // or duplicated output.
                self.emit(SessionEvent::RelayExited { code: exit.code });
                Err(SessionError::RelayExited { code: exit.code })
            }
            MonitorExit::SourceEnded => {
                self.emit(SessionEvent::UpstreamEnded);
                // The relay must be signalled before any destination-side
                // stop action.
                handle.stop().await?;
                let remote_stop_ok = self.stop_remote(&session).await;
                self.transition(SessionState::Stopped);
                info!(event_code = %session.event_code, "session stopped");
                Ok(SessionOutcome {
                    event_code: session.event_code,
                    shareable_url: session.shareable_url,
                    remote_stop_ok,
                })
            }
        }
    }

    /// Dependent call chain that creates the destination event and
    /// collects the ingest credentials.
    #[instrument(name = "create_event", skip_all)]
    async fn create_event(&self, api: &ApiClient) -> SessionResult<Session> {
        let last = api.last_event().await?;
        debug!(
            required_packages = last.required_packages.len(),
            "fetched last-event context"
        );

        let banner_url = api.upload_live_cover(&self.config.event).await?;
        let required_packages = if self.config.event.reuse_required_packages {
            last.required_packages
        } else {
            Vec::new()
        };
        let created = api
            .create_event(&self.config.event, &banner_url, required_packages)
            .await?;
        info!(code = %created.code, "destination event created");

        // The platform expects these lookups before the ingest
        // credentials become available.
        api.public_event_details(&created.code).await?;
        api.live_input(&created.code).await?;
        let ingest_target = api.backstage_input(&created.code).await?;

        Ok(Session {
            event_code: created.code,
            shareable_url: created.shareable_url,
            ingest_target,
            upstream_url: self.config.upstream_url.clone(),
        })
    }

    /// Best-effort destination-side stop. Returns `None` when no agent is
    /// configured.
    async fn stop_remote(&self, session: &Session) -> Option<bool> {
        let agent = self.remote_stop.as_ref()?;
        info!("requesting destination-side stop");
        let ok = agent.stop_remote_broadcast(session).await;
        if ok {
            info!("destination broadcast stopped");
        } else {
            warn!("destination stop failed; source already ended, continuing");
        }
        self.emit(SessionEvent::RemoteStop { ok });
        Some(ok)
    }

    fn transition(&self, next: SessionState) {
        let previous = {
            let mut state = self.state.write();
            let previous = state.clone();
            *state = next.clone();
            previous
        };
        debug!(
            previous = previous.name(),
            current = next.name(),
            "session state transition"
        );
        self.emit(SessionEvent::StateChanged {
            previous,
            current: next,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(event_tx) = &self.event_tx {
            if event_tx.send(event).is_err() {
                debug!("event receiver dropped");
            }
        }
    }
}
