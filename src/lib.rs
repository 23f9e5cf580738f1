//! rtspscout - find the camera streams on a network that actually play
//!
//! A run sweeps an address range for open RTSP ports, expands every open
//! endpoint into candidate stream URLs (paths × credentials) and asks an
//! external media probe to grab one frame from each.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod probe;
pub mod scanner;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ProbeError, ScanError, ScanResult};
pub use network::{AddressRange, Endpoint};
pub use output::ScanReport;
pub use pipeline::Pipeline;

pub type Result<T> = std::result::Result<T, ScanError>;
