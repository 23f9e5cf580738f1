//! TCP reachability checks

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// One reachability check against a socket address.
///
/// Implementations answer `true` only when a connection was actually
/// established. Refusals, unreachable hosts and timeouts are all `false`; a
/// closed port is an ordinary answer, never an error.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn is_open(&self, addr: SocketAddr, timeout: Duration) -> bool;
}

/// TCP connect scanner: a full three-way handshake, closed immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn is_open(&self, addr: SocketAddr, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // Connection successful - close quickly
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                log::trace!("{} closed: {}", addr, e);
                false
            }
            Err(_) => {
                log::trace!("{} timed out after {:?}", addr, timeout);
                false
            }
        }
    }
}
