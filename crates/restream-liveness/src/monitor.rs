//! Manifest polling loop.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use restream_types::{LivenessState, SessionEvent};

use crate::manifest::has_segment_references;
use crate::{DEFAULT_CHECK_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

/// Polling policy for the liveness monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between polls.
    pub poll_interval: Duration,

    /// Deadline for one manifest fetch.
    pub check_timeout: Duration,

    /// Treat this many consecutive UNKNOWN checks as end-of-source.
    /// `None` means UNKNOWN never ends the session on its own.
    pub max_unknown_checks: Option<u32>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            check_timeout: Duration::from_millis(DEFAULT_CHECK_TIMEOUT_MS),
            max_unknown_checks: None,
        }
    }
}

/// Polls an upstream manifest and classifies source liveness.
pub struct LivenessMonitor {
    http: Client,
    config: MonitorConfig,
    event_tx: Option<UnboundedSender<SessionEvent>>,
}

impl LivenessMonitor {
    /// Create a monitor with the given polling policy.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            event_tx: None,
        }
    }

    /// Report every check result as a [`SessionEvent::Liveness`].
    pub fn with_event_sender(mut self, event_tx: UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Classify the source from a single manifest fetch.
    ///
    /// Never fails outward; every per-check error is absorbed into
    /// `Unknown`. Only a 404 yields `Ended`.
    pub async fn check_once(&self, url: &str) -> LivenessState {
        let response = match self
            .http
            .get(url)
            .timeout(self.config.check_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "manifest fetch failed");
                return LivenessState::Unknown;
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            return LivenessState::Ended;
        }
        if !response.status().is_success() {
            debug!(status = %response.status(), "manifest fetch returned non-success");
            return LivenessState::Unknown;
        }

        match response.text().await {
            Ok(body) if has_segment_references(&body) => LivenessState::Active,
            Ok(_) => {
                debug!("manifest has no segment references");
                LivenessState::Unknown
            }
            Err(e) => {
                debug!(error = %e, "manifest body read failed");
                LivenessState::Unknown
            }
        }
    }

    /// Poll the manifest until the source ends.
    ///
    /// One check per interval, starting immediately. Resolves when a check
    /// returns ENDED, or when the configured UNKNOWN grace is exhausted.
    /// Transient failures only extend the loop. Cancellation is dropping
    /// the returned future.
    #[instrument(name = "liveness_run", skip(self))]
    pub async fn run_until_ended(&self, url: &str) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut unknown_streak: u32 = 0;

        loop {
            ticker.tick().await;

            let state = self.check_once(url).await;
            match state {
                LivenessState::Active => {
                    if unknown_streak > 0 {
                        debug!(unknown_streak, "source active again");
                    }
                    unknown_streak = 0;
                    self.report(state, unknown_streak);
                }
                LivenessState::Unknown => {
                    unknown_streak += 1;
                    warn!(unknown_streak, "source liveness unknown");
                    self.report(state, unknown_streak);
                    if let Some(max) = self.config.max_unknown_checks {
                        if unknown_streak >= max {
                            info!(unknown_streak, "liveness grace exhausted, treating source as ended");
                            return;
                        }
                    }
                }
                LivenessState::Ended => {
                    self.report(state, unknown_streak);
                    info!("upstream manifest gone, source ended");
                    return;
                }
            }
        }
    }

    fn report(&self, state: LivenessState, unknown_streak: u32) {
        if let Some(event_tx) = &self.event_tx {
            let _ = event_tx.send(SessionEvent::Liveness {
                state,
                unknown_streak,
            });
        }
    }
}
