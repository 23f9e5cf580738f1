//! Configuration module for the rtspscout pipeline

use crate::paths::{default_stream_paths, DEFAULT_PORTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for a scan-and-verify run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Address or CIDR block to sweep
    pub address: String,

    /// Comma separated port list, kept verbatim for the report
    pub ports: String,

    /// Raw credential strings (`user:pass`, or `none`)
    pub credentials: Vec<String>,

    /// Stream paths tried on every open endpoint
    pub paths: Vec<String>,

    /// Timeout for each TCP connect attempt in milliseconds
    pub connect_timeout_ms: u64,

    /// Timeout for each probe attempt in seconds
    pub probe_timeout_secs: u64,

    /// Probe attempts per candidate
    pub retries: u32,

    /// Concurrent connect attempts
    pub scan_workers: usize,

    /// Concurrent stream verifications
    pub probe_workers: usize,

    /// Largest host count accepted from a range
    pub max_hosts: u64,

    /// Media probe executable
    pub probe_binary: String,

    /// URL scheme of generated candidates
    pub scheme: String,

    /// Where probe artifacts are written; system temp dir if unset
    pub artifact_dir: Option<PathBuf>,

    /// JSON report destination
    pub output: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            address: "192.168.1.0/24".to_string(),
            ports: DEFAULT_PORTS.to_string(),
            credentials: Vec::new(),
            paths: default_stream_paths(),
            connect_timeout_ms: 1000,
            probe_timeout_secs: 10,
            retries: 2,
            scan_workers: 50,
            probe_workers: 20,
            max_hosts: 65_536,
            probe_binary: "ffmpeg".to_string(),
            scheme: "rtsp".to_string(),
            artifact_dir: None,
            output: None,
        }
    }
}

impl ScanConfig {
    /// Create a new configuration for the given address range
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the port list
    pub fn with_ports(mut self, ports: impl Into<String>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Set the stream paths
    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    /// Set the credential list
    pub fn with_credentials(mut self, credentials: Vec<String>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set both worker bounds
    pub fn with_workers(mut self, scan_workers: usize, probe_workers: usize) -> Self {
        self.scan_workers = scan_workers;
        self.probe_workers = probe_workers;
        self
    }

    /// Set the probe retry count
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the artifact directory
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Directory for probe artifacts
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            crate::ScanError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Load `~/.rtspscout.toml` when present, defaults otherwise
    pub fn load_default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_path = home_dir.join(".rtspscout.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.address.trim().is_empty() {
            return Err(crate::ScanError::InvalidRange("address cannot be empty".to_string()));
        }

        if self.scan_workers == 0 || self.probe_workers == 0 {
            return Err(crate::ScanError::ConfigError(
                "Worker counts must be greater than 0".to_string(),
            ));
        }

        if self.retries == 0 {
            return Err(crate::ScanError::ConfigError("Retries must be at least 1".to_string()));
        }

        if self.connect_timeout_ms == 0 || self.probe_timeout_secs == 0 {
            return Err(crate::ScanError::ConfigError("Timeouts must be greater than 0".to_string()));
        }

        if self.paths.is_empty() {
            return Err(crate::ScanError::ConfigError("No stream paths specified".to_string()));
        }

        if self.scheme.is_empty() {
            return Err(crate::ScanError::ConfigError("URL scheme cannot be empty".to_string()));
        }

        Ok(())
    }
}
