//! Command-line entry point: runs one relay session to completion.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use restream_session::Orchestrator;
use restream_types::{event_channel, SessionConfig, SessionEvent};

/// Relay a live upstream source into a destination broadcast platform.
#[derive(Debug, Parser)]
#[command(name = "restream", version, about)]
struct Args {
    /// Upstream live manifest URL (from the upstream locator).
    #[arg(long)]
    upstream_url: String,

    /// Base URL of the destination control API.
    #[arg(long, env = "RESTREAM_API_BASE_URL", default_value = "https://wapi.tevi.app")]
    api_base_url: String,

    /// Path of the persisted token pair.
    #[arg(long, default_value = "tokens.json")]
    tokens: PathBuf,

    /// Title of the created event.
    #[arg(long, default_value = "Live relay")]
    title: String,

    /// Channel/space name shown on the cover.
    #[arg(long, default_value = "")]
    space_name: String,

    /// Profile image URL used to render the cover.
    #[arg(long, default_value = "")]
    cover_profile_url: String,

    /// Relay tool binary.
    #[arg(long, default_value = "ffmpeg")]
    relay_command: String,

    /// Seconds between liveness polls.
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Consecutive failed liveness checks tolerated before the source is
    /// assumed gone. Unset: tolerate indefinitely.
    #[arg(long)]
    max_unknown_checks: Option<u32>,

    /// Device identifier registered with the destination account.
    #[arg(long, env = "RESTREAM_DEVICE_ID", default_value = "")]
    device_id: String,
}

impl Args {
    fn into_config(self) -> SessionConfig {
        let mut config = SessionConfig {
            api_base_url: self.api_base_url,
            upstream_url: self.upstream_url,
            tokens_path: self.tokens,
            poll_interval_ms: self.poll_interval_secs * 1_000,
            max_unknown_checks: self.max_unknown_checks,
            ..Default::default()
        };
        config.event.title = self.title;
        config.event.space_name = self.space_name;
        config.event.cover_profile_url = self.cover_profile_url;
        config.profile.command = self.relay_command;
        config.device.device_id = self.device_id;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let (event_tx, mut event_rx) = event_channel();
    let mut orchestrator = Orchestrator::new(args.into_config()).with_event_sender(event_tx);

    let observer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let SessionEvent::EventCreated { shareable_url, .. } = &event {
                info!(%shareable_url, "share link ready");
            }
        }
    });

    let result = orchestrator.run().await;
    observer.abort();

    match result {
        Ok(outcome) => {
            info!(event_code = %outcome.event_code, "session stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "session failed");
            Err(e).context("relay session failed")
        }
    }
}
