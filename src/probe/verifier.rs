//! Stream verification through an external media probe

use crate::error::ProbeError;
use crate::network::Endpoint;
use crate::probe::StreamCandidate;
use crate::scanner::{PoolOutput, ScanProgress, WorkerPool};
use crate::ScanError;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Grabs one frame of a stream into a file.
#[async_trait]
pub trait MediaProbe: Send + Sync + 'static {
    /// Fails with [`ScanError::ProbeToolMissing`] or
    /// [`ScanError::ProbeToolUnresponsive`] when probing can never work
    async fn ensure_available(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Capture `url` into `artifact`.
    ///
    /// `Ok` carries whatever the tool wrote to stderr and means it exited
    /// successfully; it does not mean the artifact has content.
    async fn capture(&self, url: &str, artifact: &Path) -> Result<String, ProbeError>;
}

/// [`MediaProbe`] backed by the `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    binary: String,
    version_timeout: Duration,
}

/// How long `ffmpeg -version` may take before the tool counts as broken
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            version_timeout: VERSION_CHECK_TIMEOUT,
        }
    }

    pub fn with_version_timeout(mut self, timeout: Duration) -> Self {
        self.version_timeout = timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// TCP transport, a single video frame, quiet logging
    fn build_command(&self, url: &str, artifact: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-y", "-loglevel", "error", "-rtsp_transport", "tcp", "-i", url])
            .args(["-frames:v", "1", "-update", "1"])
            .arg(artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn ensure_available(&self) -> crate::Result<()> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = match tokio::time::timeout(self.version_timeout, command.status()).await {
            Ok(status) => status,
            Err(_) => {
                return Err(ScanError::ProbeToolUnresponsive(
                    self.binary.clone(),
                    self.version_timeout,
                ))
            }
        };

        match status {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
                Err(ScanError::ProbeToolMissing(self.binary.clone()))
            }
            Err(e) => {
                log::warn!("Could not run {} -version: {}", self.binary, e);
                Ok(())
            }
        }
    }

    async fn capture(&self, url: &str, artifact: &Path) -> Result<String, ProbeError> {
        let output = self
            .build_command(url, artifact)
            .output()
            .await
            .map_err(|e| ProbeError::Spawn(format!("{}: {}", self.binary, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.success() {
            Ok(stderr)
        } else if stderr.is_empty() {
            Err(ProbeError::Failure(format!("{} exited with {}", self.binary, output.status)))
        } else {
            Err(ProbeError::Failure(stderr))
        }
    }
}

/// Lifecycle of one candidate's verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Pending,
    /// Running the n-th attempt (1-based)
    Attempting(u32),
    Succeeded,
    Exhausted,
}

impl VerificationState {
    /// First attempt
    pub fn start(self) -> Self {
        match self {
            VerificationState::Pending => VerificationState::Attempting(1),
            other => other,
        }
    }

    /// Transition after an attempt finished
    pub fn after_attempt(self, succeeded: bool, retries: u32) -> Self {
        match self {
            VerificationState::Attempting(_) if succeeded => VerificationState::Succeeded,
            VerificationState::Attempting(n) if n < retries => VerificationState::Attempting(n + 1),
            VerificationState::Attempting(_) => VerificationState::Exhausted,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationState::Succeeded | VerificationState::Exhausted)
    }
}

/// Result of verifying one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub url: String,
    pub endpoint: Endpoint,
    pub success: bool,
    pub attempts: u32,
    /// Last captured diagnostic; empty on success
    pub diagnostic: String,
}

/// Runs the probe against candidates with a per-attempt timeout and retries
pub struct StreamVerifier<P: MediaProbe> {
    probe: Arc<P>,
    timeout: Duration,
    retries: u32,
    artifact_dir: PathBuf,
}

impl<P: MediaProbe> Clone for StreamVerifier<P> {
    fn clone(&self) -> Self {
        Self {
            probe: Arc::clone(&self.probe),
            timeout: self.timeout,
            retries: self.retries,
            artifact_dir: self.artifact_dir.clone(),
        }
    }
}

impl<P: MediaProbe> StreamVerifier<P> {
    pub fn new(probe: Arc<P>, timeout: Duration, retries: u32, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            probe,
            timeout,
            retries: retries.max(1),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Try the candidate up to `retries` times, stopping at the first success
    pub async fn verify(&self, candidate: &StreamCandidate) -> VerificationOutcome {
        log::debug!("Testing: {}", candidate.url());

        let mut state = VerificationState::Pending.start();
        let mut attempts = 0;
        let mut diagnostic = String::new();

        while let VerificationState::Attempting(attempt) = state {
            attempts = attempt;
            let result = self.attempt(candidate).await;

            match &result {
                Ok(()) => diagnostic.clear(),
                Err(ProbeError::Timeout(after)) => {
                    log::warn!(
                        "Timeout on attempt {}/{} for {} after {:?}",
                        attempt,
                        self.retries,
                        candidate.url(),
                        after
                    );
                    // A timed-out run captured no stderr; keep the last one we have
                    if diagnostic.is_empty() {
                        diagnostic = ProbeError::Timeout(*after).diagnostic();
                    }
                }
                Err(e) => {
                    log::debug!("Attempt {}/{} for {} failed: {}", attempt, self.retries, candidate.url(), e);
                    diagnostic = e.diagnostic();
                }
            }

            state = state.after_attempt(result.is_ok(), self.retries);
        }

        let success = state == VerificationState::Succeeded;
        if success {
            log::info!("Working stream: {}", candidate.url());
        }

        VerificationOutcome {
            url: candidate.url().to_string(),
            endpoint: candidate.endpoint,
            success,
            attempts,
            diagnostic,
        }
    }

    /// One bounded probe run.
    ///
    /// The artifact lives in a uniquely named temp file that is removed when
    /// this function returns, whatever the outcome.
    async fn attempt(&self, candidate: &StreamCandidate) -> Result<(), ProbeError> {
        let artifact = tempfile::Builder::new()
            .prefix(&candidate.artifact_prefix())
            .suffix(".png")
            .tempfile_in(&self.artifact_dir)
            .map_err(|e| {
                ProbeError::Failure(format!(
                    "cannot create artifact in {}: {}",
                    self.artifact_dir.display(),
                    e
                ))
            })?
            .into_temp_path();

        let stderr = match tokio::time::timeout(self.timeout, self.probe.capture(candidate.url(), &artifact)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
        };

        let size = tokio::fs::metadata(&artifact).await.map(|m| m.len()).unwrap_or(0);
        if size > 0 {
            Ok(())
        } else {
            Err(ProbeError::EmptyArtifact(stderr))
        }
    }

    /// Verify every candidate through `pool`
    pub async fn verify_all(
        &self,
        candidates: Vec<StreamCandidate>,
        pool: &WorkerPool,
        progress: &ScanProgress,
    ) -> PoolOutput<VerificationOutcome> {
        log::info!(
            "Testing {} candidate stream(s) with {} workers",
            candidates.len(),
            pool.limit()
        );

        pool.run(candidates, progress, |candidate| {
            let verifier = self.clone();
            async move { verifier.verify(&candidate).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::CredentialVariant;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Fails until `succeed_on`, then writes a frame
    struct ScriptedProbe {
        succeed_on: Option<u32>,
        calls: AtomicU32,
        artifacts: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedProbe {
        fn new(succeed_on: Option<u32>) -> Self {
            Self {
                succeed_on,
                calls: AtomicU32::new(0),
                artifacts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MediaProbe for ScriptedProbe {
        async fn capture(&self, _url: &str, artifact: &Path) -> Result<String, ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.artifacts.lock().unwrap().push(artifact.to_path_buf());
            match self.succeed_on {
                Some(n) if call >= n => {
                    tokio::fs::write(artifact, b"\x89PNG frame").await.unwrap();
                    Ok(String::new())
                }
                _ => Err(ProbeError::Failure("method DESCRIBE failed: 404 Not Found".to_string())),
            }
        }
    }

    /// Exits cleanly without writing anything
    struct SilentProbe;

    #[async_trait]
    impl MediaProbe for SilentProbe {
        async fn capture(&self, _url: &str, _artifact: &Path) -> Result<String, ProbeError> {
            Ok("Output file is empty, nothing was encoded".to_string())
        }
    }

    /// Never answers in time
    struct HangingProbe {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MediaProbe for HangingProbe {
        async fn capture(&self, _url: &str, _artifact: &Path) -> Result<String, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    /// Rejects the login once, then stops answering
    struct RejectThenHang {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MediaProbe for RejectThenHang {
        async fn capture(&self, _url: &str, _artifact: &Path) -> Result<String, ProbeError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ProbeError::Failure("401 Unauthorized".to_string()));
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    struct PeakProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl MediaProbe for PeakProbe {
        async fn capture(&self, _url: &str, artifact: &Path) -> Result<String, ProbeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::fs::write(artifact, b"frame").await.unwrap();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    fn candidate(path: &str) -> StreamCandidate {
        let endpoint = Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8)), 554);
        StreamCandidate::new("rtsp", endpoint, path, CredentialVariant::Anonymous)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_state_machine() {
        let state = VerificationState::Pending.start();
        assert_eq!(state, VerificationState::Attempting(1));
        assert_eq!(state.after_attempt(false, 2), VerificationState::Attempting(2));
        assert_eq!(state.after_attempt(true, 2), VerificationState::Succeeded);
        assert_eq!(
            VerificationState::Attempting(2).after_attempt(false, 2),
            VerificationState::Exhausted
        );
        assert!(VerificationState::Exhausted.is_terminal());
        assert_eq!(VerificationState::Succeeded.after_attempt(false, 5), VerificationState::Succeeded);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(ScriptedProbe::new(Some(3)));
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_secs(1), 3, dir.path());

        let outcome = verifier.verify(&candidate("/live")).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.diagnostic.is_empty());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(ScriptedProbe::new(Some(1)));
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_secs(1), 4, dir.path());

        let outcome = verifier.verify(&candidate("/live")).await;

        assert!(outcome.success);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_always_failing_probe_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(ScriptedProbe::new(None));
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_secs(1), 2, dir.path());

        let outcome = verifier.verify(&candidate("/Streaming/Channels/101")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.diagnostic.contains("404 Not Found"));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_artifacts_are_unique_per_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(ScriptedProbe::new(None));
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_secs(1), 3, dir.path());

        verifier.verify(&candidate("/live")).await;

        let artifacts = probe.artifacts.lock().unwrap().clone();
        assert_eq!(artifacts.len(), 3);
        for artifact in &artifacts {
            let name = artifact.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("rtsp_10_0_0_8_554__live_"), "{}", name);
            assert!(name.ends_with(".png"));
        }
        let mut unique = artifacts.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[tokio::test]
    async fn test_clean_exit_with_empty_artifact_is_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = StreamVerifier::new(Arc::new(SilentProbe), Duration::from_secs(1), 2, dir.path());

        let outcome = verifier.verify(&candidate("/")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.diagnostic, "Output file is empty, nothing was encoded");
    }

    #[tokio::test]
    async fn test_timeouts_consume_retries() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(HangingProbe {
            calls: AtomicU32::new(0),
        });
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_millis(20), 2, dir.path());

        let outcome = verifier.verify(&candidate("/live")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.diagnostic.contains("timed out"));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_timeout_keeps_earlier_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Arc::new(RejectThenHang {
            calls: AtomicU32::new(0),
        });
        let verifier = StreamVerifier::new(Arc::clone(&tool), Duration::from_millis(30), 2, dir.path());

        let outcome = verifier.verify(&candidate("/live")).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.diagnostic, "401 Unauthorized");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_verify_all_respects_worker_bound() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(PeakProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let verifier = StreamVerifier::new(Arc::clone(&probe), Duration::from_secs(1), 1, dir.path());
        let candidates: Vec<_> = (0..30).map(|n| candidate(&format!("/ch{}", n))).collect();
        let pool = WorkerPool::new(4, CancellationToken::new());
        let progress = ScanProgress::hidden(30);

        let output = verifier.verify_all(candidates, &pool, &progress).await;

        assert_eq!(output.results.len(), 30);
        assert!(output.results.iter().all(|o| o.success));
        assert!(probe.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let probe = FfmpegProbe::new("/nonexistent/rtspscout-ffmpeg");
        assert!(matches!(
            probe.ensure_available().await,
            Err(ScanError::ProbeToolMissing(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stuck_binary_fails_the_version_check() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = FfmpegProbe::new(script.to_string_lossy()).with_version_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let result = tool.ensure_available().await;

        assert!(matches!(result, Err(ScanError::ProbeToolUnresponsive(_, _))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
