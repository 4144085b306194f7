pub mod actors;
pub mod config;
pub mod engine;
pub mod error;
pub mod monitors;
pub mod registry;
pub mod util;

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hostname used when the reverse lookup fails
pub const HOSTNAME_NOT_AVAILABLE: &str = "N/A";

/// Hostname of the synthetic internet reachability entry
pub const INTERNET_HOSTNAME: &str = "INTERNET";

/// Liveness state of a monitored host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Scanning,
    Up,
    Unstable,
    Down,
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostStatus::Scanning => write!(f, "Scanning..."),
            HostStatus::Up => write!(f, "Online"),
            HostStatus::Unstable => write!(f, "Unstable"),
            HostStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// Read-only view of one registry entry, handed out by snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostView {
    pub address: Ipv4Addr,
    pub hostname: String,
    pub status: HostStatus,
    pub consecutive_failures: u32,
    /// Whether this is the internet reachability entry
    pub sentinel: bool,
    /// Creation time or time of the last status change
    pub last_change: DateTime<Utc>,
}

/// Number of hosts per status, excluding the internet sentinel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub scanning: usize,
    pub up: usize,
    pub unstable: usize,
    pub down: usize,
}

impl StatusSummary {
    pub fn from_hosts<'a>(hosts: impl IntoIterator<Item = &'a HostView>) -> Self {
        hosts
            .into_iter()
            .filter(|host| !host.sentinel)
            .fold(StatusSummary::default(), |mut summary, host| {
                match host.status {
                    HostStatus::Scanning => summary.scanning += 1,
                    HostStatus::Up => summary.up += 1,
                    HostStatus::Unstable => summary.unstable += 1,
                    HostStatus::Down => summary.down += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.scanning + self.up + self.unstable + self.down
    }
}

/// A status transition of a single host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub address: Ipv4Addr,
    pub hostname: String,
    pub previous: HostStatus,
    pub current: HostStatus,
    pub consecutive_failures: u32,
    /// Set exactly when the host just went down
    pub alert: bool,
    pub timestamp: DateTime<Utc>,
}
