//! Address range expansion and port list parsing

use crate::ScanError;
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A parsed CIDR block (a bare address is a single-host block).
///
/// Host bits in the input are cleared, so `192.168.1.7/24` covers the whole
/// `192.168.1.0/24` network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    spec: String,
    network: IpNetwork,
}

impl AddressRange {
    /// Parse an address or CIDR block
    pub fn parse(spec: &str) -> crate::Result<Self> {
        let trimmed = spec.trim();
        let parsed: IpNetwork = trimmed
            .parse()
            .map_err(|e: ipnetwork::IpNetworkError| {
                ScanError::InvalidRange(format!("{}: {}", trimmed, e))
            })?;

        let network = IpNetwork::new(parsed.network(), parsed.prefix())
            .map_err(|e| ScanError::InvalidRange(format!("{}: {}", trimmed, e)))?;

        Ok(Self {
            spec: trimmed.to_string(),
            network,
        })
    }

    /// The input string, as given
    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn network(&self) -> IpNetwork {
        self.network
    }

    /// Number of hosts [`hosts`](Self::hosts) yields, computed without iterating
    pub fn host_count(&self) -> u128 {
        let (first, last) = self.host_bounds();
        last - first + 1
    }

    /// Iterate the host addresses in ascending order.
    ///
    /// Every call starts a fresh iteration, so the range can be walked once for
    /// accounting and again for dispatch.
    pub fn hosts(&self) -> Hosts {
        let (first, last) = self.host_bounds();
        Hosts {
            next: first,
            last,
            v6: self.network.is_ipv6(),
            exhausted: false,
        }
    }

    /// Inclusive bounds of the usable hosts.
    ///
    /// IPv4 blocks up to /30 drop the network and broadcast addresses, /31 and
    /// /32 keep every address. IPv6 blocks shorter than /127 drop the
    /// subnet-router anycast address.
    fn host_bounds(&self) -> (u128, u128) {
        match self.network {
            IpNetwork::V4(net) => {
                let base = u32::from(net.network()) as u128;
                let last = base + (1u128 << (32 - net.prefix() as u32)) - 1;
                if net.prefix() <= 30 {
                    (base + 1, last - 1)
                } else {
                    (base, last)
                }
            }
            IpNetwork::V6(net) => {
                let base = u128::from(net.network());
                let host_bits = 128 - net.prefix() as u32;
                let mask = if host_bits == 128 {
                    u128::MAX
                } else {
                    (1u128 << host_bits) - 1
                };
                let last = base | mask;
                if net.prefix() < 127 {
                    (base + 1, last)
                } else {
                    (base, last)
                }
            }
        }
    }
}

/// Ascending host iterator produced by [`AddressRange::hosts`]
#[derive(Debug, Clone)]
pub struct Hosts {
    next: u128,
    last: u128,
    v6: bool,
    exhausted: bool,
}

impl Iterator for Hosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if self.exhausted || self.next > self.last {
            return None;
        }

        let current = self.next;
        if current == self.last {
            self.exhausted = true;
        } else {
            self.next += 1;
        }

        Some(if self.v6 {
            IpAddr::V6(Ipv6Addr::from(current))
        } else {
            IpAddr::V4(Ipv4Addr::from(current as u32))
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted || self.next > self.last {
            return (0, Some(0));
        }
        let remaining = self.last - self.next + 1;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// Parse a comma separated port list, preserving order and duplicates
pub fn parse_ports(spec: &str) -> crate::Result<Vec<u16>> {
    let mut ports = Vec::new();

    for item in spec.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let port: u16 = item
            .parse()
            .map_err(|_| ScanError::InvalidPorts(format!("'{}' is not a port number", item)))?;
        if port == 0 {
            return Err(ScanError::InvalidPorts("port 0 cannot be scanned".to_string()));
        }
        ports.push(port);
    }

    if ports.is_empty() {
        return Err(ScanError::InvalidPorts("no ports specified".to_string()));
    }

    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_slash_30_has_two_hosts() {
        let range = AddressRange::parse("10.0.0.0/30").unwrap();
        assert_eq!(range.host_count(), 2);
        assert_eq!(range.hosts().collect::<Vec<_>>(), vec![v4(10, 0, 0, 1), v4(10, 0, 0, 2)]);
    }

    #[test]
    fn test_bare_address_is_single_host() {
        let range = AddressRange::parse("192.168.1.64").unwrap();
        assert_eq!(range.host_count(), 1);
        assert_eq!(range.hosts().collect::<Vec<_>>(), vec![v4(192, 168, 1, 64)]);
    }

    #[test]
    fn test_slash_31_keeps_both_addresses() {
        let range = AddressRange::parse("10.0.0.4/31").unwrap();
        assert_eq!(range.hosts().collect::<Vec<_>>(), vec![v4(10, 0, 0, 4), v4(10, 0, 0, 5)]);
    }

    #[test]
    fn test_host_bits_are_cleared() {
        let range = AddressRange::parse("192.168.1.77/24").unwrap();
        assert_eq!(range.spec(), "192.168.1.77/24");
        assert_eq!(range.host_count(), 254);
        assert_eq!(range.hosts().next(), Some(v4(192, 168, 1, 1)));
        assert_eq!(range.hosts().last(), Some(v4(192, 168, 1, 254)));
    }

    #[test]
    fn test_hosts_is_restartable() {
        let range = AddressRange::parse("172.16.0.0/29").unwrap();
        let first_pass = range.hosts().count();
        let second_pass: Vec<_> = range.hosts().collect();
        assert_eq!(first_pass, 6);
        assert_eq!(second_pass.len(), 6);
    }

    #[test]
    fn test_ipv6_ranges() {
        let range = AddressRange::parse("2001:db8::/126").unwrap();
        assert_eq!(range.host_count(), 3);

        let single = AddressRange::parse("2001:db8::1").unwrap();
        assert_eq!(single.host_count(), 1);

        let everything = AddressRange::parse("::/0").unwrap();
        assert_eq!(everything.host_count(), u128::MAX);
    }

    #[test]
    fn test_invalid_ranges() {
        for bad in ["not-an-ip", "10.0.0.0/33", "300.1.1.1", ""] {
            assert!(
                matches!(AddressRange::parse(bad), Err(ScanError::InvalidRange(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_ports_preserves_order() {
        assert_eq!(parse_ports("554, 8554").unwrap(), vec![554, 8554]);
        assert_eq!(parse_ports("8554,554,554").unwrap(), vec![8554, 554, 554]);
    }

    #[test]
    fn test_parse_ports_rejects_garbage() {
        assert!(matches!(parse_ports("554,http"), Err(ScanError::InvalidPorts(_))));
        assert!(parse_ports("70000").is_err());
        assert!(parse_ports("0").is_err());
        assert!(parse_ports(" , ").is_err());
    }

    proptest! {
        #[test]
        fn prop_ipv4_host_count(a in any::<u8>(), b in any::<u8>(), prefix in 16u8..=32) {
            let range = AddressRange::parse(&format!("{}.{}.0.0/{}", a, b, prefix)).unwrap();
            let size = 1u128 << (32 - prefix as u32);
            let expected = if prefix <= 30 { size - 2 } else { size };
            prop_assert_eq!(range.host_count(), expected);
            if prefix >= 22 {
                prop_assert_eq!(range.hosts().count() as u128, expected);
            }
        }

        #[test]
        fn prop_port_list_round_trips(ports in proptest::collection::vec(1u16..=u16::MAX, 1..20)) {
            let spec = ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            prop_assert_eq!(parse_ports(&spec).unwrap(), ports);
        }
    }
}
