//! Port-scan stage: one TCP connect per (host, port) pair

use crate::network::{AddressRange, Connector, Endpoint};
use crate::scanner::{ScanProgress, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the port-scan stage saw
#[derive(Debug, Clone, Default)]
pub struct PortScanOutcome {
    /// Reachable endpoints, sorted and without duplicates
    pub open: Vec<Endpoint>,
    /// Connect attempts handed to the pool
    pub submitted: usize,
    /// Connect attempts that reported back
    pub completed: usize,
    pub interrupted: bool,
}

/// Sweeps every host of a range against every port of a list
pub struct PortScanner<C: Connector> {
    connector: Arc<C>,
    timeout: Duration,
    pool: WorkerPool,
}

impl<C: Connector> PortScanner<C> {
    pub fn new(connector: Arc<C>, workers: usize, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            connector,
            timeout,
            pool: WorkerPool::new(workers, cancel),
        }
    }

    /// |hosts| × |ports|
    pub fn total_attempts(range: &AddressRange, ports: &[u16]) -> u128 {
        range.host_count().saturating_mul(ports.len() as u128)
    }

    /// Attempt a connect to every pair and keep those that answered
    pub async fn scan(&self, range: &AddressRange, ports: &[u16], progress: &ScanProgress) -> PortScanOutcome {
        log::info!(
            "Scanning {} address(es) across {} port(s) with {} workers",
            range.host_count(),
            ports.len(),
            self.pool.limit()
        );

        let pairs = range
            .hosts()
            .flat_map(|ip| ports.iter().map(move |&port| Endpoint::new(ip, port)));

        let connector = Arc::clone(&self.connector);
        let timeout = self.timeout;
        let output = self
            .pool
            .run(pairs, progress, |endpoint| {
                let connector = Arc::clone(&connector);
                async move {
                    let open = connector.is_open(endpoint.socket_addr(), timeout).await;
                    if open {
                        log::info!("Found open port: {}", endpoint);
                    }
                    (endpoint, open)
                }
            })
            .await;

        let completed = output.results.len();
        let mut open: Vec<Endpoint> = output
            .results
            .into_iter()
            .filter_map(|(endpoint, open)| open.then_some(endpoint))
            .collect();
        open.sort_unstable();
        open.dedup();

        log::info!(
            "Completed {} of {} scans. Found {} open port(s).",
            completed,
            output.submitted,
            open.len()
        );

        PortScanOutcome {
            open,
            submitted: output.submitted,
            completed,
            interrupted: output.interrupted,
        }
    }
}
