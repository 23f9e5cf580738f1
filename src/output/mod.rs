//! Report assembly, JSON persistence and terminal summary

use crate::network::Endpoint;
use crate::probe::VerificationOutcome;
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One reachable endpoint as stored in the JSON report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOpenPort {
    pub ip: String,
    pub port: u16,
    pub open: bool,
}

impl From<&Endpoint> for JsonOpenPort {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            ip: endpoint.ip.to_string(),
            port: endpoint.port,
            open: true,
        }
    }
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Local time the report was assembled, `%Y-%m-%d %H:%M:%S`
    pub scan_time: String,
    pub address_range: String,
    pub ports_scanned: String,
    pub open_ports: Vec<JsonOpenPort>,
    pub working_streams: Vec<String>,
    /// Set when the run was cut short and the lists are partial
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

impl ScanReport {
    /// Collect reachable endpoints and the URLs that verified.
    ///
    /// Both lists are sorted so that two runs over the same network compare
    /// equal regardless of completion order.
    pub fn assemble(
        address_range: &str,
        ports_scanned: &str,
        endpoints: &[Endpoint],
        outcomes: &[VerificationOutcome],
        interrupted: bool,
    ) -> Self {
        let mut endpoints = endpoints.to_vec();
        endpoints.sort_unstable();
        endpoints.dedup();

        let mut working_streams: Vec<String> = outcomes
            .iter()
            .filter(|outcome| outcome.success)
            .map(|outcome| outcome.url.clone())
            .collect();
        working_streams.sort();
        working_streams.dedup();

        Self {
            scan_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            address_range: address_range.to_string(),
            ports_scanned: ports_scanned.to_string(),
            open_ports: endpoints.iter().map(JsonOpenPort::from).collect(),
            working_streams,
            interrupted,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::ScanError::OutputError(e.to_string()))
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> crate::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)
            .map_err(|e| crate::ScanError::OutputError(format!("{}: {}", path.display(), e)))?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Terminal rendering options
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { colored: true }
    }
}

/// Renders reports for the terminal
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Human readable summary
    pub fn format_text(&self, report: &ScanReport) -> String {
        let mut output = String::new();

        output.push_str(&self.paint("\n===== SCAN RESULTS =====\n", |s| s.bold()));
        if report.interrupted {
            output.push_str(&self.paint("(partial results: scan was interrupted)\n", |s| s.yellow()));
        }

        output.push_str(&format!(
            "Discovered {} potential RTSP sources:\n",
            report.open_ports.len()
        ));
        for port in &report.open_ports {
            output.push_str(&format!("  {}\n", endpoint_label(&port.ip, port.port)));
        }

        output.push_str(&format!(
            "\nDiscovered {} working RTSP streams:\n",
            report.working_streams.len()
        ));
        for stream in &report.working_streams {
            let line = format!("  {}\n", stream);
            output.push_str(&self.paint(&line, |s| s.bright_green()));
        }

        output
    }

    fn paint(&self, text: &str, style: impl Fn(ColoredString) -> ColoredString) -> String {
        if self.config.colored {
            style(text.normal()).to_string()
        } else {
            text.to_string()
        }
    }
}

fn endpoint_label(ip: &str, port: u16) -> String {
    if ip.contains(':') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}
