//! Host registry shared between discovery, monitoring and presentation
//!
//! ## Ordering
//!
//! While discovery runs, workers insert in whatever order their probes finish.
//! [`HostRegistry::finalize_discovery`] sorts the entries once, ascending by
//! numeric address with the internet sentinel last, and closes the registry for
//! further registrations. From then on only status fields change.
//!
//! ## Locking
//!
//! Every operation takes the same exclusive lock and releases it before
//! returning. The lock is never held across a probe or a DNS lookup.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{debug, trace};

use crate::{
    HOSTNAME_NOT_AVAILABLE, HostView, INTERNET_HOSTNAME, StatusChange, StatusSummary,
    error::{MonitorError, MonitorResult},
    monitors::{liveness::Liveness, subnet::SubnetPrefix},
};

/// Reverse name lookup used when registering a host
pub trait HostnameResolver: Send + Sync {
    fn resolve(&self, address: Ipv4Addr) -> Option<String>;
}

/// Resolves names through the system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseDns;

impl HostnameResolver for ReverseDns {
    fn resolve(&self, address: Ipv4Addr) -> Option<String> {
        dns_lookup::lookup_addr(&IpAddr::V4(address)).ok()
    }
}

#[derive(Debug, Clone)]
struct MonitoredHost {
    address: Ipv4Addr,
    hostname: String,
    liveness: Liveness,
    sentinel: bool,
    last_change: DateTime<Utc>,
}

impl MonitoredHost {
    fn view(&self) -> HostView {
        HostView {
            address: self.address,
            hostname: self.hostname.clone(),
            status: self.liveness.status,
            consecutive_failures: self.liveness.consecutive_failures,
            sentinel: self.sentinel,
            last_change: self.last_change,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    hosts: Vec<MonitoredHost>,
    discovery_complete: bool,
    subnet: Option<SubnetPrefix>,
}

impl RegistryState {
    fn contains(&self, address: Ipv4Addr) -> bool {
        self.hosts.iter().any(|host| host.address == address)
    }
}

/// Consistent copy of the registry at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub hosts: Vec<HostView>,
    pub discovery_complete: bool,
    pub subnet: Option<SubnetPrefix>,
}

impl RegistrySnapshot {
    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_hosts(&self.hosts)
    }

    pub fn sentinel(&self) -> Option<&HostView> {
        self.hosts.iter().find(|host| host.sentinel)
    }
}

/// Handle to the shared host list
///
/// Cloning is cheap; all clones see the same hosts.
#[derive(Clone)]
pub struct HostRegistry {
    state: Arc<Mutex<RegistryState>>,
    resolver: Arc<dyn HostnameResolver>,
    discovery_tx: Arc<watch::Sender<bool>>,
}

impl HostRegistry {
    /// Registry resolving hostnames via reverse DNS
    pub fn new() -> Self {
        Self::with_resolver(ReverseDns)
    }

    pub fn with_resolver(resolver: impl HostnameResolver + 'static) -> Self {
        let (discovery_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            resolver: Arc::new(resolver),
            discovery_tx: Arc::new(discovery_tx),
        }
    }

    /// Record the prefix being scanned, for presentation
    pub async fn set_subnet(&self, subnet: SubnetPrefix) {
        self.state.lock().await.subnet = Some(subnet);
    }

    /// Register a responding host
    ///
    /// Returns the new entry, or `None` when the address was already known.
    /// The hostname is the override if given, otherwise the reverse lookup
    /// result, otherwise `N/A`.
    pub async fn register(
        &self,
        address: Ipv4Addr,
        hostname_override: Option<&str>,
    ) -> MonitorResult<Option<HostView>> {
        self.insert(address, hostname_override, false).await
    }

    /// Register the synthetic entry standing for internet reachability
    pub async fn register_internet_check(
        &self,
        address: Ipv4Addr,
    ) -> MonitorResult<Option<HostView>> {
        self.insert(address, Some(INTERNET_HOSTNAME), true).await
    }

    async fn insert(
        &self,
        address: Ipv4Addr,
        hostname_override: Option<&str>,
        sentinel: bool,
    ) -> MonitorResult<Option<HostView>> {
        {
            let state = self.state.lock().await;
            if state.discovery_complete {
                return Err(MonitorError::RegistrySealed(address));
            }
            if state.contains(address) {
                trace!("{address} already registered");
                return Ok(None);
            }
        }

        let hostname = match hostname_override {
            Some(hostname) => hostname.to_string(),
            None => self.resolve_hostname(address).await,
        };

        let mut state = self.state.lock().await;
        if state.discovery_complete {
            return Err(MonitorError::RegistrySealed(address));
        }
        // another worker may have won the race while we were resolving
        if state.contains(address) {
            return Ok(None);
        }

        let host = MonitoredHost {
            address,
            hostname,
            liveness: Liveness::up(),
            sentinel,
            last_change: Utc::now(),
        };
        let view = host.view();

        state.hosts.try_reserve(1)?;
        state.hosts.push(host);

        debug!("registered {address} ({} hosts)", state.hosts.len());
        Ok(Some(view))
    }

    async fn resolve_hostname(&self, address: Ipv4Addr) -> String {
        let resolver = Arc::clone(&self.resolver);
        tokio::task::spawn_blocking(move || resolver.resolve(address))
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| HOSTNAME_NOT_AVAILABLE.to_string())
    }

    /// Sort the hosts and close the registry for new entries
    ///
    /// Only the first call sorts. Returns the number of hosts.
    pub async fn finalize_discovery(&self) -> usize {
        let count = {
            let mut state = self.state.lock().await;
            if !state.discovery_complete {
                state
                    .hosts
                    .sort_by_key(|host| (host.sentinel, u32::from(host.address)));
                state.discovery_complete = true;
            }
            state.hosts.len()
        };

        self.discovery_tx.send_replace(true);
        count
    }

    pub async fn is_discovery_complete(&self) -> bool {
        self.state.lock().await.discovery_complete
    }

    /// Wait until the host list is final
    pub async fn discovery_completed(&self) {
        let mut rx = self.discovery_tx.subscribe();
        // the sender lives as long as `self`, so this cannot fail while we wait
        let _ = rx.wait_for(|complete| *complete).await;
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().await;
        RegistrySnapshot {
            hosts: state.hosts.iter().map(MonitoredHost::view).collect(),
            discovery_complete: state.discovery_complete,
            subnet: state.subnet,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.hosts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Addresses in registry order
    pub async fn addresses(&self) -> Vec<Ipv4Addr> {
        let state = self.state.lock().await;
        state.hosts.iter().map(|host| host.address).collect()
    }

    /// Apply the result of one monitoring round to the host at `index`
    ///
    /// Returns the transition if the status changed. Only the monitor loop
    /// should call this.
    pub async fn update_status(
        &self,
        index: usize,
        reachable: bool,
        threshold: u32,
    ) -> Option<StatusChange> {
        let mut state = self.state.lock().await;
        let host = state.hosts.get_mut(index)?;

        let previous = host.liveness.status;
        let (next, evaluation) = host.liveness.advance(reachable, threshold);
        host.liveness = next;

        if previous == next.status {
            return None;
        }

        host.last_change = Utc::now();
        Some(StatusChange {
            address: host.address,
            hostname: host.hostname.clone(),
            previous,
            current: next.status,
            consecutive_failures: next.consecutive_failures,
            alert: evaluation.is_alert(),
            timestamp: host.last_change,
        })
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}
