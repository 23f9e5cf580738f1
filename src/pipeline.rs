//! Scan-then-verify orchestration
//!
//! Stage two only starts after stage one has fully drained, and it only ever
//! sees the endpoints stage one reported open.

use crate::config::ScanConfig;
use crate::network::{parse_ports, AddressRange, Connector, TcpConnector};
use crate::output::ScanReport;
use crate::probe::{CandidateGenerator, FfmpegProbe, MediaProbe, StreamVerifier};
use crate::scanner::{PortScanner, ScanProgress, WorkerPool};
use crate::ScanError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One complete run over an address range
pub struct Pipeline<C: Connector, P: MediaProbe> {
    config: ScanConfig,
    connector: Arc<C>,
    probe: Arc<P>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Pipeline<TcpConnector, FfmpegProbe> {
    /// Real TCP connects and the configured ffmpeg binary
    pub fn from_config(config: ScanConfig) -> Self {
        let probe = FfmpegProbe::new(config.probe_binary.clone());
        Self::new(config, Arc::new(TcpConnector::new()), Arc::new(probe))
    }
}

impl<C: Connector, P: MediaProbe> Pipeline<C, P> {
    pub fn new(config: ScanConfig, connector: Arc<C>, probe: Arc<P>) -> Self {
        Self {
            config,
            connector,
            probe,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Draw progress bars while running
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run both stages and assemble the report.
    ///
    /// Fails before any connect attempt when the configuration, the range or
    /// the port list is invalid, or when the probe tool is unavailable. An
    /// interrupt is not an error: the partial report comes back flagged.
    pub async fn run(&self) -> crate::Result<ScanReport> {
        self.config.validate()?;
        let range = AddressRange::parse(&self.config.address)?;
        let ports = parse_ports(&self.config.ports)?;

        let hosts = range.host_count();
        if hosts > self.config.max_hosts as u128 {
            return Err(ScanError::InvalidRange(format!(
                "{} covers {} hosts, more than the limit of {}",
                range.spec(),
                hosts,
                self.config.max_hosts
            )));
        }

        self.probe.ensure_available().await?;

        log::info!("Starting network scan for {}", range.spec());
        let total = PortScanner::<C>::total_attempts(&range, &ports);
        let progress = self.progress("Scanning", u64::try_from(total).unwrap_or(u64::MAX));
        let scanner = PortScanner::new(
            Arc::clone(&self.connector),
            self.config.scan_workers,
            self.config.connect_timeout(),
            self.cancel.clone(),
        );
        let scan = scanner.scan(&range, &ports, &progress).await;
        progress.finish();

        if scan.interrupted || scan.open.is_empty() {
            if scan.open.is_empty() && !scan.interrupted {
                log::info!("No open ports found, skipping stream verification");
            }
            return Ok(ScanReport::assemble(
                range.spec(),
                &self.config.ports,
                &scan.open,
                &[],
                scan.interrupted,
            ));
        }

        let generator = CandidateGenerator::new(&self.config.scheme, &self.config.paths, &self.config.credentials);
        let candidates = generator.generate(&scan.open);

        let progress = self.progress("Probing", candidates.len() as u64);
        let verifier = StreamVerifier::new(
            Arc::clone(&self.probe),
            self.config.probe_timeout(),
            self.config.retries,
            self.config.artifact_dir(),
        );
        let pool = WorkerPool::new(self.config.probe_workers, self.cancel.clone());
        let verified = verifier.verify_all(candidates, &pool, &progress).await;
        progress.finish();

        Ok(ScanReport::assemble(
            range.spec(),
            &self.config.ports,
            &scan.open,
            &verified.results,
            verified.interrupted,
        ))
    }

    fn progress(&self, label: &'static str, total: u64) -> ScanProgress {
        if self.show_progress {
            ScanProgress::new(label, total)
        } else {
            ScanProgress::hidden(total)
        }
    }
}
