//! Classification of where an event came from.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of the client that submitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFamily {
    /// Submitted over a connection from an IPv4 address.
    #[serde(rename = "IP4")]
    Ip4,
    /// Submitted over a connection from an IPv6 address.
    #[serde(rename = "IP6")]
    Ip6,
    /// Loaded locally, with no remote address.
    Import,
}

/// Error returned when raw address bytes have an unsupported length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("source address has unsupported length {0}")]
pub struct InvalidSourceAddress(pub usize);

impl SourceFamily {
    /// Classifies raw address bytes by length: 4 is IPv4, 16 is IPv6 and an
    /// empty address marks a local import.
    pub fn classify(addr: &[u8]) -> Result<Self, InvalidSourceAddress> {
        match addr.len() {
            4 => Ok(Self::Ip4),
            16 => Ok(Self::Ip6),
            0 => Ok(Self::Import),
            n => Err(InvalidSourceAddress(n)),
        }
    }

    /// Returns the canonical label for this family.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ip4 => "IP4",
            Self::Ip6 => "IP6",
            Self::Import => "Import",
        }
    }

    /// Renders raw address bytes as text. Imports render as an empty string.
    pub fn format_addr(addr: &[u8]) -> String {
        if let Ok(octets) = <[u8; 4]>::try_from(addr) {
            return IpAddr::V4(Ipv4Addr::from(octets)).to_string();
        }
        if let Ok(octets) = <[u8; 16]>::try_from(addr) {
            return IpAddr::V6(Ipv6Addr::from(octets)).to_string();
        }
        String::new()
    }
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_length() {
        assert_eq!(SourceFamily::classify(&[127, 0, 0, 1]), Ok(SourceFamily::Ip4));
        assert_eq!(SourceFamily::classify(&[0u8; 16]), Ok(SourceFamily::Ip6));
        assert_eq!(SourceFamily::classify(&[]), Ok(SourceFamily::Import));
        assert_eq!(
            SourceFamily::classify(&[1, 2, 3]),
            Err(InvalidSourceAddress(3))
        );
    }

    #[test]
    fn format_addr_renders_ip_text() {
        assert_eq!(SourceFamily::format_addr(&[10, 0, 0, 7]), "10.0.0.7");

        let mut v6 = [0u8; 16];
        v6[15] = 1;
        assert_eq!(SourceFamily::format_addr(&v6), "::1");
        assert_eq!(SourceFamily::format_addr(&[]), "");
    }

    #[test]
    fn serializes_with_wire_labels() {
        assert_eq!(serde_json::to_string(&SourceFamily::Ip4).unwrap(), "\"IP4\"");
        assert_eq!(
            serde_json::to_string(&SourceFamily::Import).unwrap(),
            "\"Import\""
        );
        assert_eq!(SourceFamily::Ip6.to_string(), "IP6");
    }
}
