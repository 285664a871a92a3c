//! Validated network identities.
//!
//! SSIDs and passphrases are owned, length-checked strings. Anything that
//! reaches the registry or the radio has already passed these checks, so the
//! rest of the crate never re-validates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::SupervisorError;

/// Longest SSID accepted, in bytes.
pub const SSID_MAX_LEN: usize = 31;

/// Longest WPA passphrase accepted, in bytes.
pub const PASSPHRASE_MAX_LEN: usize = 63;

/// A non-empty SSID of at most [`SSID_MAX_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ssid(String);

impl Ssid {
    pub fn new(ssid: &str) -> Result<Self, SupervisorError> {
        if ssid.is_empty() {
            return Err(SupervisorError::InvalidCredential("SSID is empty".into()));
        }
        if ssid.len() > SSID_MAX_LEN {
            return Err(SupervisorError::InvalidCredential(format!(
                "SSID is {} bytes, at most {} allowed",
                ssid.len(),
                SSID_MAX_LEN
            )));
        }
        Ok(Ssid(ssid.to_string()))
    }

    /// Builds an SSID from arbitrary text, cutting it down to
    /// [`SSID_MAX_LEN`] bytes on a character boundary.
    ///
    /// Returns `None` when nothing usable is left.
    pub fn truncated(text: &str) -> Option<Self> {
        let mut end = text.len().min(SSID_MAX_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Ssid::new(&text[..end]).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-empty passphrase of at most [`PASSPHRASE_MAX_LEN`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Validates an optional passphrase.
    ///
    /// An empty string is treated like no passphrase at all: the network is
    /// open.
    pub fn optional(pass: Option<&str>) -> Result<Option<Self>, SupervisorError> {
        match pass {
            None => Ok(None),
            Some(p) if p.len() > PASSPHRASE_MAX_LEN => {
                Err(SupervisorError::InvalidCredential(format!(
                    "passphrase is {} bytes, at most {} allowed",
                    p.len(),
                    PASSPHRASE_MAX_LEN
                )))
            }
            Some("") => Ok(None),
            Some(p) => Ok(Some(Passphrase(p.to_string()))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase({})", "*".repeat(self.0.len().min(12)))
    }
}

/// Static IPv4 configuration. Its presence on a credential disables DHCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIp {
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    #[serde(default)]
    pub dns: Option<Ipv4Addr>,
}

impl StaticIp {
    /// Parses dotted-quad strings, e.g. from a provisioning payload.
    pub fn parse(
        address: &str,
        gateway: &str,
        netmask: &str,
        dns: Option<&str>,
    ) -> Result<Self, SupervisorError> {
        let ip = |s: &str| {
            s.parse::<Ipv4Addr>()
                .map_err(|_| SupervisorError::InvalidAddress(s.to_string()))
        };
        Ok(StaticIp {
            address: ip(address)?,
            gateway: ip(gateway)?,
            netmask: ip(netmask)?,
            dns: dns.filter(|d| !d.is_empty()).map(ip).transpose()?,
        })
    }

    /// Netmask as a CIDR prefix length (255.255.255.0 -> 24).
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.netmask).count_ones()
    }
}

/// One configured network: what the station should join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCredential {
    pub ssid: Ssid,
    pub passphrase: Option<Passphrase>,
    pub static_ip: Option<StaticIp>,
}

impl NetworkCredential {
    pub fn new(
        ssid: &str,
        passphrase: Option<&str>,
        static_ip: Option<StaticIp>,
    ) -> Result<Self, SupervisorError> {
        Ok(NetworkCredential {
            ssid: Ssid::new(ssid)?,
            passphrase: Passphrase::optional(passphrase)?,
            static_ip,
        })
    }

    pub fn is_open(&self) -> bool {
        self.passphrase.is_none()
    }

    pub fn uses_dhcp(&self) -> bool {
        self.static_ip.is_none()
    }
}

/// The soft access point hosted as a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointConfig {
    pub ssid: Ssid,
    pub passphrase: Option<Passphrase>,
    pub static_ip: Option<StaticIp>,
}

impl AccessPointConfig {
    pub fn new(
        ssid: &str,
        passphrase: Option<&str>,
        static_ip: Option<StaticIp>,
    ) -> Result<Self, SupervisorError> {
        Ok(AccessPointConfig {
            ssid: Ssid::new(ssid)?,
            passphrase: Passphrase::optional(passphrase)?,
            static_ip,
        })
    }

    /// Open access point named after the host, used when none was configured.
    pub fn from_hostname(hostname: &str) -> Option<Self> {
        Ssid::truncated(hostname).map(|ssid| AccessPointConfig {
            ssid,
            passphrase: None,
            static_ip: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_length_limits() {
        assert!(Ssid::new(&"a".repeat(31)).is_ok());
        assert!(matches!(
            Ssid::new(&"a".repeat(32)),
            Err(SupervisorError::InvalidCredential(_))
        ));
        assert!(Ssid::new("").is_err());
    }

    #[test]
    fn passphrase_length_limits() {
        assert!(NetworkCredential::new("Home", Some(&"p".repeat(63)), None).is_ok());
        assert!(NetworkCredential::new("Home", Some(&"p".repeat(64)), None).is_err());
    }

    #[test]
    fn empty_passphrase_means_open() {
        let cred = NetworkCredential::new("Cafe", Some(""), None).unwrap();
        assert!(cred.is_open());
        assert!(cred.uses_dhcp());
    }

    #[test]
    fn passphrase_is_masked_in_debug_output() {
        let cred = NetworkCredential::new("Home", Some("hunter22"), None).unwrap();
        let dbg = format!("{:?}", cred);
        assert!(!dbg.contains("hunter22"));
    }

    #[test]
    fn truncated_respects_char_boundaries() {
        let name = format!("{}é", "x".repeat(30));
        let ssid = Ssid::truncated(&name).unwrap();
        assert_eq!(ssid.as_str(), "x".repeat(30));
        assert!(Ssid::truncated("").is_none());
    }

    #[test]
    fn static_ip_parsing() {
        let ip = StaticIp::parse("192.168.1.50", "192.168.1.1", "255.255.255.0", Some("1.1.1.1"))
            .unwrap();
        assert_eq!(ip.prefix_len(), 24);
        assert_eq!(ip.dns, Some(Ipv4Addr::new(1, 1, 1, 1)));

        assert_eq!(
            StaticIp::parse("192.168.1.300", "192.168.1.1", "255.255.255.0", None),
            Err(SupervisorError::InvalidAddress("192.168.1.300".into()))
        );
    }
}
