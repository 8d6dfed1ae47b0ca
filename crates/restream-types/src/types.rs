//! Session configuration and aggregate types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default milliseconds between liveness polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Default deadline for one manifest fetch in milliseconds.
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 10_000;

/// Default deadline for one control-API request in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default grace period before an unresponsive relay is killed.
pub const DEFAULT_STOP_GRACE_MS: u64 = 5_000;

/// A running session's identity, owned exclusively by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Destination event code.
    pub event_code: String,

    /// Public link to the destination broadcast.
    pub shareable_url: String,

    /// Ingest URL the relay process pushes media into.
    pub ingest_target: String,

    /// Upstream live manifest URL.
    pub upstream_url: String,
}

/// Everything needed to run one relay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the destination control API.
    pub api_base_url: String,

    /// Upstream live manifest URL (supplied by the upstream locator).
    pub upstream_url: String,

    /// Path of the persisted token pair.
    pub tokens_path: PathBuf,

    /// Device metadata sent with token refreshes.
    pub device: DeviceInfo,

    /// Destination event parameters.
    pub event: EventSpec,

    /// Relay process parameters.
    pub profile: RelayProfile,

    /// Milliseconds between liveness polls.
    pub poll_interval_ms: u64,

    /// Deadline for one manifest fetch in milliseconds.
    pub check_timeout_ms: u64,

    /// Deadline for one control-API request in milliseconds.
    pub request_timeout_ms: u64,

    /// Consecutive UNKNOWN liveness checks treated as end-of-source.
    /// `None` means UNKNOWN never ends the session on its own.
    pub max_unknown_checks: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            upstream_url: String::new(),
            tokens_path: PathBuf::from("tokens.json"),
            device: DeviceInfo::default(),
            event: EventSpec::default(),
            profile: RelayProfile::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_unknown_checks: None,
        }
    }
}

/// Device metadata the destination API expects with a token refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable device identifier registered with the destination account.
    pub device_id: String,

    /// Device category (e.g. "browser").
    pub device_type: String,

    /// Operating system name.
    pub os: String,

    /// Human-readable device name.
    pub device_name: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            device_type: "browser".to_string(),
            os: "Windows".to_string(),
            device_name: "Chrome".to_string(),
        }
    }
}

/// Parameters for the destination event to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSpec {
    /// Event title.
    pub title: String,

    /// Event description.
    pub description: String,

    /// Channel/space name shown on the cover.
    pub space_name: String,

    /// Profile image URL used to render the cover.
    pub cover_profile_url: String,

    /// Event visibility ("public" or "private").
    pub visibility: String,

    /// Ticket price.
    pub price: u32,

    /// Ticket price currency.
    pub price_currency: String,

    /// Whether followers are notified.
    pub notification: bool,

    /// Whether chat is enabled.
    pub allow_chat: bool,

    /// Whether viewers may capture the stream.
    pub allowed_capture: bool,

    /// Reuse the required-packages restriction of the account's last event.
    pub reuse_required_packages: bool,
}

impl Default for EventSpec {
    fn default() -> Self {
        Self {
            title: "Live relay".to_string(),
            description: String::new(),
            space_name: String::new(),
            cover_profile_url: String::new(),
            visibility: "public".to_string(),
            price: 0,
            price_currency: "TVS".to_string(),
            notification: true,
            allow_chat: true,
            allowed_capture: false,
            reuse_required_packages: false,
        }
    }
}

/// Declarative configuration for the external relay process.
///
/// The relay tool is treated as a black box; this profile only describes
/// the ordered argument list it is launched with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayProfile {
    /// Relay tool binary.
    pub command: String,

    /// Video codec ("copy" forwards the upstream encoding untouched).
    pub video_codec: String,

    /// Audio codec.
    pub audio_codec: String,

    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Number of audio channels.
    pub audio_channels: u16,

    /// Output buffer size argument.
    pub buffer_size: String,

    /// Output container format.
    pub container: String,

    /// Read the source at its native frame rate.
    pub realtime_input: bool,

    /// Grace period in milliseconds before an unresponsive relay is killed.
    pub stop_grace_ms: u64,
}

impl Default for RelayProfile {
    fn default() -> Self {
        Self {
            command: "ffmpeg".to_string(),
            video_codec: "copy".to_string(),
            audio_codec: "aac".to_string(),
            audio_sample_rate: 44_100,
            audio_bitrate_kbps: 128,
            audio_channels: 2,
            buffer_size: "2500k".to_string(),
            container: "flv".to_string(),
            realtime_input: true,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
        }
    }
}

impl RelayProfile {
    /// Build the ordered argument list for one relay run.
    pub fn args(&self, source_url: &str, ingest_target: &str) -> Vec<String> {
        let mut args = Vec::new();
        if self.realtime_input {
            args.push("-re".to_string());
        }
        args.push("-i".to_string());
        args.push(source_url.to_string());
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        args.push("-c:a".to_string());
        args.push(self.audio_codec.clone());
        args.push("-ar".to_string());
        args.push(self.audio_sample_rate.to_string());
        args.push("-ab".to_string());
        args.push(format!("{}k", self.audio_bitrate_kbps));
        args.push("-ac".to_string());
        args.push(self.audio_channels.to_string());
        if self.audio_codec == "aac" {
            args.push("-strict".to_string());
            args.push("-2".to_string());
            args.push("-flags".to_string());
            args.push("+global_header".to_string());
            if self.container == "flv" {
                args.push("-bsf:a".to_string());
                args.push("aac_adtstoasc".to_string());
            }
        }
        args.push("-bufsize".to_string());
        args.push(self.buffer_size.clone());
        args.push("-f".to_string());
        args.push(self.container.clone());
        args.push(ingest_target.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_args_order() {
        let profile = RelayProfile::default();
        let args = profile.args("https://src/live.m3u8", "rtmps://dest/live/key");

        assert_eq!(args[0], "-re");
        assert_eq!(args[1], "-i");
        assert_eq!(args[2], "https://src/live.m3u8");
        assert_eq!(args.last().unwrap(), "rtmps://dest/live/key");

        // Source comes before any codec options, target is last.
        let fmt = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[fmt + 1], "flv");
        assert!(args.contains(&"aac_adtstoasc".to_string()));
    }

    #[test]
    fn test_profile_args_skip_aac_flags_for_copy() {
        let profile = RelayProfile {
            audio_codec: "copy".to_string(),
            ..Default::default()
        };
        let args = profile.args("src", "dst");

        assert!(!args.contains(&"aac_adtstoasc".to_string()));
        assert!(!args.contains(&"+global_header".to_string()));
    }
}
