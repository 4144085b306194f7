//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: control messages sent to a specific actor via mpsc
//! 2. **Events**: broadcast notifications published to every subscriber
//! 3. **Immutability**: all events are cloneable for multi-subscriber fan-out

use std::net::Ipv4Addr;

use crate::{StatusChange, StatusSummary};

/// Event published by discovery and the monitor loop
///
/// Subscribers that fall behind lose events; the registry snapshot stays the
/// source of truth for the host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A worker found and registered a new host
    HostDiscovered { address: Ipv4Addr, hostname: String },

    /// The host list is final and sorted
    DiscoveryComplete { hosts: usize },

    /// A host moved to another status
    StatusChanged(StatusChange),

    /// A host just went down
    Alert,

    /// Every host was probed once
    RoundComplete { round: u64, summary: StatusSummary },
}

/// Commands that can be sent to the AlertActor
#[derive(Debug)]
pub enum AlertCommand {
    /// Stop forwarding alerts to the sink
    ///
    /// Useful for maintenance windows.
    Mute,

    /// Forward alerts again
    Unmute,

    /// Gracefully shut down the alert actor
    Shutdown,
}
