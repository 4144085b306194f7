//! Helper types for integration tests

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use lanwatch::{
    actors::{discovery::DiscoveryPlan, messages::MonitorEvent},
    monitors::{probe::Prober, subnet::SubnetPrefix},
    registry::{HostRegistry, HostnameResolver},
};
use tokio::sync::broadcast;

pub const INTERNET: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

pub struct NoNames;

impl HostnameResolver for NoNames {
    fn resolve(&self, _address: Ipv4Addr) -> Option<String> {
        None
    }
}

/// Prober answering for a switchable set of hosts on a single port
pub struct ScriptedProber {
    port: u16,
    alive: Mutex<HashSet<Ipv4Addr>>,
    delay: Duration,
    probes: AtomicUsize,
    visited: Mutex<Vec<Ipv4Addr>>,
}

impl ScriptedProber {
    pub fn new(port: u16, alive: impl IntoIterator<Item = Ipv4Addr>) -> Arc<Self> {
        Arc::new(Self {
            port,
            alive: Mutex::new(alive.into_iter().collect()),
            delay: Duration::ZERO,
            probes: AtomicUsize::new(0),
            visited: Mutex::new(vec![]),
        })
    }

    /// Same as `new`, but every probe takes `delay`
    pub fn slow(port: u16, alive: impl IntoIterator<Item = Ipv4Addr>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            port,
            alive: Mutex::new(alive.into_iter().collect()),
            delay,
            probes: AtomicUsize::new(0),
            visited: Mutex::new(vec![]),
        })
    }

    pub fn set(&self, address: Ipv4Addr, alive: bool) {
        let mut hosts = self.alive.lock().unwrap();
        if alive {
            hosts.insert(address);
        } else {
            hosts.remove(&address);
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Every address probed on the first port of a port list
    pub fn visited(&self) -> Vec<Ipv4Addr> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: Ipv4Addr, port: u16) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if port == FIRST_PORT {
            self.visited.lock().unwrap().push(address);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        port == self.port && self.alive.lock().unwrap().contains(&address)
    }
}

pub const FIRST_PORT: u16 = 22;

pub fn test_plan(subnet: SubnetPrefix, workers: usize) -> DiscoveryPlan {
    DiscoveryPlan {
        subnet,
        first_host: 1,
        last_host: 254,
        workers,
        ports: vec![FIRST_PORT, 80, 443],
        internet_check: INTERNET,
    }
}

pub fn test_registry() -> HostRegistry {
    HostRegistry::with_resolver(NoNames)
}

pub fn drain(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

pub fn count_alerts(events: &[MonitorEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, MonitorEvent::Alert))
        .count()
}
