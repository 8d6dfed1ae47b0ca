//! Starting, observing, and stopping the relay child process.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time;
use tracing::{debug, info, instrument, warn};
use url::Url;

use restream_types::{RelayProfile, SessionEvent};

use crate::error::ProcessError;
use crate::{ProcessResult, DEFAULT_STOP_GRACE_MS};

/// Observed status of the relay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// Spawned, no output observed yet.
    Starting,

    /// Producing output, no exit observed yet.
    Running,

    /// Terminated on its own or after a quit request.
    Exited,

    /// Terminated by a forced kill.
    Killed,
}

/// Exit report for a finished relay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitResult {
    /// Process exit code (`None` when killed by a signal).
    pub code: Option<i32>,
}

impl ExitResult {
    /// Returns true for a clean zero exit.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Launches relay processes from a declarative profile.
#[derive(Debug, Clone)]
pub struct RelaySupervisor {
    stop_grace: Duration,
    event_tx: Option<UnboundedSender<SessionEvent>>,
}

impl Default for RelaySupervisor {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_millis(DEFAULT_STOP_GRACE_MS),
            event_tx: None,
        }
    }
}

impl RelaySupervisor {
    /// Create a supervisor with the default stop grace period.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a supervisor with a custom stop grace period.
    pub fn with_stop_grace(stop_grace: Duration) -> Self {
        Self {
            stop_grace,
            event_tx: None,
        }
    }

    /// Report the relay's first output line as a
    /// [`SessionEvent::RelayOutput`].
    pub fn with_event_sender(mut self, event_tx: UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Launch the relay tool copying `source_url` into `ingest_target`.
    ///
    /// Returns as soon as the process is spawned; the relay's own startup
    /// (connecting, probing the source) happens in the background. Output
    /// streams are captured for diagnostics only.
    #[instrument(name = "relay_start", skip(self, profile))]
    pub fn start(
        &self,
        source_url: &str,
        ingest_target: &str,
        profile: &RelayProfile,
    ) -> ProcessResult<RelayHandle> {
        Url::parse(ingest_target)?;
        let args = profile.args(source_url, ingest_target);
        self.spawn(&profile.command, &args)
    }

    fn spawn(&self, program: &str, args: &[String]) -> ProcessResult<RelayHandle> {
        debug!(command = program, ?args, "spawning relay process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProcessError::Spawn)?;

        let pid = child.id();
        info!(?pid, command = program, "relay process started");

        let stdin = child.stdin.take();
        let output_seen = Arc::new(AtomicBool::new(false));
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(
                "stdout",
                stdout,
                Arc::clone(&output_seen),
                self.event_tx.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(
                "stderr",
                stderr,
                Arc::clone(&output_seen),
                self.event_tx.clone(),
            ));
        }

        Ok(RelayHandle {
            child,
            stdin,
            pid,
            status: RelayStatus::Starting,
            output_seen,
            exit: None,
            stop_grace: self.stop_grace,
        })
    }
}

/// Log relay diagnostics; the first line doubles as a weak signal that
/// the relay has begun transmitting (logging and reporting only, never
/// correctness).
async fn forward_output<R>(
    stream: &'static str,
    reader: R,
    output_seen: Arc<AtomicBool>,
    event_tx: Option<UnboundedSender<SessionEvent>>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let first = !output_seen.swap(true, Ordering::SeqCst);
        if first {
            info!(stream, %line, "relay output began");
            if let Some(event_tx) = &event_tx {
                let _ = event_tx.send(SessionEvent::RelayOutput { line });
            }
        } else {
            debug!(stream, %line, "relay");
        }
    }
}

/// Owned handle to one running relay process.
///
/// The orchestrator never touches the process directly; everything goes
/// through this handle.
#[derive(Debug)]
pub struct RelayHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    pid: Option<u32>,
    status: RelayStatus,
    output_seen: Arc<AtomicBool>,
    exit: Option<ExitResult>,
    stop_grace: Duration,
}

impl RelayHandle {
    /// OS process id, if still known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Last observed status. The Starting→Running edge is the relay's
    /// first output line.
    pub fn status(&self) -> RelayStatus {
        match self.status {
            RelayStatus::Starting if self.output_seen.load(Ordering::SeqCst) => {
                RelayStatus::Running
            }
            status => status,
        }
    }

    /// Wait for the relay process to terminate on its own.
    ///
    /// Cancel safe; callable again after completion, returning the same
    /// exit result.
    pub async fn wait(&mut self) -> ProcessResult<ExitResult> {
        if let Some(exit) = self.exit {
            return Ok(exit);
        }

        let status = self.child.wait().await?;
        let exit = ExitResult {
            code: status.code(),
        };
        self.exit = Some(exit);
        self.status = RelayStatus::Exited;
        Ok(exit)
    }

    /// Stop the relay: graceful quit request first, forced kill after the
    /// grace period. Calling this on an already-exited relay is a no-op.
    #[instrument(name = "relay_stop", skip(self))]
    pub async fn stop(&mut self) -> ProcessResult<()> {
        if self.exit.is_some() {
            debug!("relay already exited, nothing to stop");
            return Ok(());
        }
        if let Some(status) = self.child.try_wait()? {
            self.exit = Some(ExitResult {
                code: status.code(),
            });
            self.status = RelayStatus::Exited;
            debug!("relay already exited, nothing to stop");
            return Ok(());
        }

        // The relay tool treats `q` on stdin as a quit request.
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!(error = %e, "quit request not delivered");
            }
            let _ = stdin.shutdown().await;
        }

        match time::timeout(self.stop_grace, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                self.exit = Some(ExitResult {
                    code: status.code(),
                });
                self.status = RelayStatus::Exited;
                info!(code = ?status.code(), "relay exited after quit request");
            }
            Err(_) => {
                warn!(grace = ?self.stop_grace, "relay ignored quit request, killing");
                self.child.kill().await?;
                self.exit = Some(ExitResult { code: None });
                self.status = RelayStatus::Killed;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use restream_types::event_channel;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_status_is_starting_until_first_output() {
        let supervisor = RelaySupervisor::with_stop_grace(Duration::from_millis(100));
        // `cat` with a piped stdin produces no output on its own.
        let mut handle = supervisor.spawn("cat", &[]).unwrap();

        assert_eq!(handle.status(), RelayStatus::Starting);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_first_output_is_reported_and_flips_status() {
        let (event_tx, mut event_rx) = event_channel();
        let supervisor = RelaySupervisor::new().with_event_sender(event_tx);
        let mut handle = supervisor.spawn("echo", &args(&["ready"])).unwrap();

        match event_rx.recv().await {
            Some(SessionEvent::RelayOutput { line }) => assert_eq!(line, "ready"),
            other => panic!("expected a relay output event, got {other:?}"),
        }
        assert_eq!(handle.status(), RelayStatus::Running);

        let exit = handle.wait().await.unwrap();
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_wait_reports_clean_exit() {
        let supervisor = RelaySupervisor::new();
        let mut handle = supervisor.spawn("true", &[]).unwrap();

        let exit = handle.wait().await.unwrap();
        assert_eq!(exit.code, Some(0));
        assert!(exit.success());
        assert_eq!(handle.status(), RelayStatus::Exited);
    }

    #[tokio::test]
    async fn test_wait_reports_failure_code() {
        let supervisor = RelaySupervisor::new();
        let mut handle = supervisor.spawn("false", &[]).unwrap();

        let exit = handle.wait().await.unwrap();
        assert_eq!(exit.code, Some(1));
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_wait_twice_returns_same_result() {
        let supervisor = RelaySupervisor::new();
        let mut handle = supervisor.spawn("true", &[]).unwrap();

        let first = handle.wait().await.unwrap();
        let second = handle.wait().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stop_after_exit_is_noop() {
        let supervisor = RelaySupervisor::new();
        let mut handle = supervisor.spawn("true", &[]).unwrap();

        handle.wait().await.unwrap();
        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
        assert_eq!(handle.status(), RelayStatus::Exited);
    }

    #[tokio::test]
    async fn test_stop_gracefully_ends_stdin_reader() {
        let supervisor = RelaySupervisor::with_stop_grace(Duration::from_secs(5));
        // `cat` exits as soon as its stdin is closed by the quit request.
        let mut handle = supervisor.spawn("cat", &[]).unwrap();

        handle.stop().await.unwrap();
        assert_eq!(handle.status(), RelayStatus::Exited);
    }

    #[tokio::test]
    async fn test_stop_kills_unresponsive_process() {
        let supervisor = RelaySupervisor::with_stop_grace(Duration::from_millis(100));
        let mut handle = supervisor.spawn("sleep", &args(&["30"])).unwrap();

        handle.stop().await.unwrap();
        assert_eq!(handle.status(), RelayStatus::Killed);

        // Idempotent after the kill.
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_target() {
        let supervisor = RelaySupervisor::new();
        let profile = RelayProfile::default();

        let err = supervisor
            .start("https://src/live.m3u8", "not a url", &profile)
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_start_reports_spawn_failure() {
        let supervisor = RelaySupervisor::new();
        let profile = RelayProfile {
            command: "definitely-not-a-real-relay-tool".to_string(),
            ..Default::default()
        };

        let err = supervisor
            .start("https://src/live.m3u8", "rtmp://dest/live/key", &profile)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn(_)));
    }
}
