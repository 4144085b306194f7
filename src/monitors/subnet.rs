//! Subnet detection
//!
//! Finds the /24 the local machine sits in by looking at the first IPv4
//! address of a physical (wired or wireless) interface. Enumeration is behind
//! [`InterfaceSource`] so the matching logic stays platform independent.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::error::{MonitorError, MonitorResult};

/// Maximum length of a subnet prefix, separator included
const MAX_PREFIX_LEN: usize = 15;

const SEPARATOR: char = '.';

#[cfg(not(windows))]
static PHYSICAL_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(en|eth|wl)").expect("valid interface pattern"));

#[cfg(windows)]
static PHYSICAL_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ethernet|wi-?fi|wlan)").expect("valid interface pattern")
});

/// The first three octets of a /24, displayed as `A.B.C.`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubnetPrefix([u8; 3]);

impl SubnetPrefix {
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// Prefix of the /24 containing `address`
    pub fn of(address: Ipv4Addr) -> Self {
        let [a, b, c, _] = address.octets();
        Self([a, b, c])
    }

    /// Full address of host `host` within this subnet
    pub fn host(&self, host: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, host)
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        Self::of(address) == *self
    }
}

impl fmt::Display for SubnetPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}.")
    }
}

impl FromStr for SubnetPrefix {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| MonitorError::InvalidSubnet {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.len() > MAX_PREFIX_LEN {
            return Err(invalid("must be shorter than 16 characters"));
        }
        let Some(octets) = value.strip_suffix(SEPARATOR) else {
            return Err(invalid("must end with '.'"));
        };

        let parsed = octets
            .split(SEPARATOR)
            .map(u8::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("octets must be numbers between 0 and 255"))?;

        match parsed.as_slice() {
            [a, b, c] => Ok(Self([*a, *b, *c])),
            _ => Err(invalid("must contain exactly three octets")),
        }
    }
}

impl<'de> Deserialize<'de> for SubnetPrefix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A local network interface with one of its IPv4 addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInterface {
    pub name: String,
    pub address: Ipv4Addr,
}

/// Capability to list the local IPv4 interfaces
pub trait InterfaceSource: Send + Sync {
    fn ipv4_interfaces(&self) -> MonitorResult<Vec<LocalInterface>>;
}

/// Interfaces of the machine we run on
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn ipv4_interfaces(&self) -> MonitorResult<Vec<LocalInterface>> {
        let interfaces = local_ip_address::list_afinet_netifas()
            .map_err(|e| MonitorError::InterfaceEnumeration(e.to_string()))?;

        Ok(interfaces
            .into_iter()
            .filter_map(|(name, ip)| match ip {
                IpAddr::V4(address) => Some(LocalInterface { name, address }),
                IpAddr::V6(_) => None,
            })
            .collect())
    }
}

/// Whether the interface name looks like a wired or wireless adapter
pub fn is_physical_interface(name: &str) -> bool {
    PHYSICAL_INTERFACE.is_match(name)
}

/// Detect the /24 of the first physical interface with a unicast IPv4 address
pub fn detect_subnet(source: &dyn InterfaceSource) -> Option<SubnetPrefix> {
    let interfaces = match source.ipv4_interfaces() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!("{e}");
            return None;
        }
    };

    interfaces
        .iter()
        .filter(|interface| is_physical_interface(&interface.name))
        .find(|interface| {
            let address = interface.address;
            !(address.is_loopback() || address.is_unspecified() || address.is_multicast())
        })
        .map(|interface| {
            debug!("using interface {} ({})", interface.name, interface.address);
            SubnetPrefix::of(interface.address)
        })
}

/// Decide which prefix to scan
///
/// The operator override wins, then the configured prefix, then detection.
/// When nothing can be detected the fallback is used.
pub fn resolve_subnet(
    operator_override: Option<SubnetPrefix>,
    configured: Option<SubnetPrefix>,
    source: &dyn InterfaceSource,
    fallback: SubnetPrefix,
) -> SubnetPrefix {
    if let Some(prefix) = operator_override {
        info!("using user-provided subnet {prefix}0/24");
        return prefix;
    }

    if let Some(prefix) = configured {
        info!("using configured subnet {prefix}0/24");
        return prefix;
    }

    match detect_subnet(source) {
        Some(prefix) => {
            info!("detected local subnet, scanning {prefix}0/24");
            prefix
        }
        None => {
            warn!("could not detect local subnet, falling back to {fallback}0/24");
            fallback
        }
    }
}
