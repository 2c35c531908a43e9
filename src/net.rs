//! Network layer header sizes.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// IP version a datagram travels over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    /// IPv4, 20 byte header (no options).
    Ipv4,
    /// IPv6, 40 byte fixed header.
    Ipv6,
}

impl IpVersion {
    /// The version with the larger header.
    pub const WORST_CASE: IpVersion = IpVersion::Ipv6;

    /// Size of the IP header in bytes.
    pub const fn header_len(&self) -> usize {
        match self {
            IpVersion::Ipv4 => 20,
            IpVersion::Ipv6 => 40,
        }
    }

    /// Returns the version as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            IpVersion::Ipv4 => "ipv4",
            IpVersion::Ipv6 => "ipv6",
        }
    }
}

impl From<IpAddr> for IpVersion {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::Ipv4,
            IpAddr::V6(_) => IpVersion::Ipv6,
        }
    }
}

impl From<&SocketAddr> for IpVersion {
    fn from(addr: &SocketAddr) -> Self {
        addr.ip().into()
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of protocol used in network communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// UDP
    Udp,
    /// TCP (See RFC 4571 for framing)
    Tcp,
}

impl Protocol {
    /// The protocol with the larger header. TCP is a superset of UDP here.
    pub const WORST_CASE: Protocol = Protocol::Tcp;

    /// Size of the transport header in bytes.
    ///
    /// For TCP this is the header without options.
    pub const fn header_len(&self) -> usize {
        match self {
            Protocol::Udp => 8,
            Protocol::Tcp => 20,
        }
    }

    /// Returns the protocol as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        }
    }
}

impl TryFrom<&str> for Protocol {
    type Error = ();

    fn try_from(proto: &str) -> Result<Self, Self::Error> {
        let proto = proto.to_lowercase();
        match proto.as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            _ => Err(()),
        }
    }
}

impl From<Protocol> for &str {
    fn from(proto: Protocol) -> Self {
        proto.as_str()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
