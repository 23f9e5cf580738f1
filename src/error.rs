//! Error handling for the rtspscout pipeline
//!
//! Only two failures are fatal for a whole run: an address range that cannot be
//! parsed and a missing media-probe tool. Everything that can go wrong inside a
//! single connect or a single probe attempt is contained in that task and turned
//! into an outcome value.

use std::time::Duration;
use thiserror::Error;

/// Main error type for scan operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid IP address or network: {0}")]
    InvalidRange(String),

    #[error("Invalid port list: {0}")]
    InvalidPorts(String),

    #[error("{0} is required but was not found in PATH")]
    ProbeToolMissing(String),

    #[error("{0} did not answer -version within {1:?}")]
    ProbeToolUnresponsive(String, Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure of one verification attempt.
///
/// These never escape [`crate::probe::StreamVerifier`]: each one consumes a
/// retry and, once retries run out, its text becomes the diagnostic of an
/// unverified outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    Failure(String),

    #[error("probe produced an empty output artifact")]
    EmptyArtifact(String),

    #[error("failed to spawn probe: {0}")]
    Spawn(String),
}

impl ProbeError {
    /// Diagnostic text captured from the tool, or the error description
    pub fn diagnostic(&self) -> String {
        match self {
            ProbeError::Failure(stderr) | ProbeError::EmptyArtifact(stderr) if !stderr.is_empty() => {
                stderr.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let err = ProbeError::Failure("401 Unauthorized".to_string());
        assert_eq!(err.diagnostic(), "401 Unauthorized");

        let err = ProbeError::EmptyArtifact(String::new());
        assert_eq!(err.diagnostic(), "probe produced an empty output artifact");
    }

    #[test]
    fn test_timeout_message() {
        let err = ProbeError::Timeout(Duration::from_secs(10));
        assert!(err.diagnostic().contains("timed out"));
    }
}
