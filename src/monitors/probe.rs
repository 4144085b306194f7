//! TCP reachability probes
//!
//! A host counts as reachable on a port when a TCP handshake completes within
//! the timeout. A refused connection proves the host exists but still counts as
//! unreachable, same as a timeout or a socket that could not be set up.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Ports tried, in order, when checking whether a host is alive
pub const COMMON_PORTS: [u16; 8] = [21, 22, 23, 80, 443, 445, 3389, 8080];

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// Something that can tell whether an (address, port) pair accepts connections
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: Ipv4Addr, port: u16) -> bool;
}

/// Detailed result of a single connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Handshake completed
    Open,
    /// Peer answered with a reset
    Refused,
    /// No answer within the timeout
    TimedOut,
    /// Socket setup or connect failed for another reason
    Failed(io::ErrorKind),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Open)
    }
}

/// Probes by opening a TCP connection with a bounded wait
#[derive(Debug, Clone, Copy)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Attempt one connection and report what happened
    ///
    /// Blocks the calling task for at most the configured timeout. The socket is
    /// closed as soon as the outcome is known.
    pub async fn check(&self, address: Ipv4Addr, port: u16) -> ProbeOutcome {
        let target = SocketAddr::from((address, port));

        let outcome = match timeout(self.timeout, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => ProbeOutcome::Open,
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => ProbeOutcome::Refused,
            Ok(Err(e)) => ProbeOutcome::Failed(e.kind()),
            Err(_) => ProbeOutcome::TimedOut,
        };

        trace!("{target}: {outcome:?}");
        outcome
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: Ipv4Addr, port: u16) -> bool {
        self.check(address, port).await.is_reachable()
    }
}

/// Probe `ports` in order and stop at the first one that answers
pub async fn probe_any(prober: &dyn Prober, address: Ipv4Addr, ports: &[u16]) -> bool {
    for &port in ports {
        if prober.probe(address, port).await {
            return true;
        }
    }
    false
}
