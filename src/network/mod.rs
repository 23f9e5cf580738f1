//! Network module: address ranges, port lists and TCP reachability

pub mod range;
pub mod socket;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

pub use range::{parse_ports, AddressRange, Hosts};
pub use socket::{Connector, TcpConnector};

/// A (host, port) pair confirmed reachable by a TCP connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl fmt::Display for Endpoint {
    /// `host:port`, with IPv6 hosts bracketed so the result can sit inside a URL
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_endpoint_display() {
        let v4 = Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 554);
        assert_eq!(v4.to_string(), "10.0.0.5:554");

        let v6 = Endpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8554);
        assert_eq!(v6.to_string(), "[::1]:8554");
    }
}
