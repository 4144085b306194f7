//! Discovery - finds the hosts worth monitoring
//!
//! The host range is cut into contiguous shards, one per worker. Every worker
//! walks its shard address by address, probes the common ports and registers
//! the first host that answers. Once all workers are done the internet check is
//! appended and the registry is sorted and sealed.
//!
//! ## Message Flow
//!
//! ```text
//! shard → probe_any → register → HostDiscovered
//!   ...
//! join all workers → internet check → finalize → DiscoveryComplete
//! ```

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{MonitorError, MonitorResult},
    monitors::{
        probe::{Prober, probe_any},
        subnet::SubnetPrefix,
    },
    registry::HostRegistry,
};

use super::{messages::MonitorEvent, publish};

/// Everything a discovery run needs to know
#[derive(Debug, Clone)]
pub struct DiscoveryPlan {
    pub subnet: SubnetPrefix,
    pub first_host: u8,
    pub last_host: u8,
    pub workers: usize,
    pub ports: Vec<u16>,
    /// Address of the synthetic internet reachability entry
    pub internet_check: Ipv4Addr,
}

/// How a discovery run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Registry is sorted and sealed
    Complete { hosts: usize },
    /// Shutdown was requested before all shards were walked
    Cancelled,
}

/// Split `first..=last` into `workers` contiguous shards
///
/// Shards are equally sized except the last one, which also takes the
/// remainder. The worker count is clamped to the size of the range.
pub fn partition(first: u8, last: u8, workers: usize) -> Vec<RangeInclusive<u8>> {
    if first > last {
        return vec![];
    }

    let first = usize::from(first);
    let last = usize::from(last);
    let total = last - first + 1;
    let workers = workers.clamp(1, total);
    let per_worker = total / workers;

    (0..workers)
        .map(|i| {
            let start = first + i * per_worker;
            let end = if i == workers - 1 {
                last
            } else {
                start + per_worker - 1
            };
            // both ends lie within `first..=last`, so they fit into a u8
            start as u8..=end as u8
        })
        .collect()
}

/// Runs the worker pool and seals the registry afterwards
pub struct DiscoveryCoordinator {
    registry: HostRegistry,
    prober: Arc<dyn Prober>,
    event_tx: broadcast::Sender<MonitorEvent>,
    cancel: CancellationToken,
}

impl DiscoveryCoordinator {
    pub fn new(
        registry: HostRegistry,
        prober: Arc<dyn Prober>,
        event_tx: broadcast::Sender<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            prober,
            event_tx,
            cancel,
        }
    }

    /// Probe the whole host range and wait for every worker
    ///
    /// Fails if the internet check address lies inside the scanned subnet or
    /// if the registry could not take another host. A worker that panics is
    /// logged and its shard stays unprobed.
    ///
    /// When cancelled, neither the internet check entry is added nor the
    /// registry sealed, so [`HostRegistry::discovery_completed`] does not
    /// resolve for that run.
    #[instrument(skip_all, fields(subnet = %plan.subnet))]
    pub async fn discover(&self, plan: &DiscoveryPlan) -> MonitorResult<DiscoveryOutcome> {
        if plan.subnet.contains(plan.internet_check) {
            return Err(MonitorError::InvalidConfig(format!(
                "internet check {} lies inside the scanned subnet {}0/24",
                plan.internet_check, plan.subnet
            )));
        }

        let shards = partition(plan.first_host, plan.last_host, plan.workers);
        info!(
            "discovering {}{}-{} with {} workers",
            plan.subnet,
            plan.first_host,
            plan.last_host,
            shards.len()
        );

        let ports: Arc<[u16]> = plan.ports.clone().into();
        // stops the remaining workers if one of them hits a fatal error
        let abort = self.cancel.child_token();

        let handles: Vec<_> = shards
            .iter()
            .cloned()
            .map(|shard| {
                let worker = DiscoveryWorker {
                    shard,
                    subnet: plan.subnet,
                    ports: Arc::clone(&ports),
                    registry: self.registry.clone(),
                    prober: Arc::clone(&self.prober),
                    event_tx: self.event_tx.clone(),
                    cancel: abort.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut failure: Option<MonitorError> = None;
        for (shard, result) in shards.iter().zip(join_all(handles).await) {
            match result {
                Ok(Ok(found)) => debug!("shard {shard:?}: {found} hosts"),
                Ok(Err(e)) => {
                    error!("shard {shard:?}: {e}");
                    abort.cancel();
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(e) => error!("discovery worker for shard {shard:?} failed: {e}"),
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        if self.cancel.is_cancelled() {
            warn!("discovery cancelled");
            return Ok(DiscoveryOutcome::Cancelled);
        }

        if let Some(host) = self.registry.register_internet_check(plan.internet_check).await? {
            publish(
                &self.event_tx,
                MonitorEvent::HostDiscovered {
                    address: host.address,
                    hostname: host.hostname,
                },
            );
        }

        let hosts = self.registry.finalize_discovery().await;
        info!("discovery complete, monitoring {hosts} hosts");
        publish(&self.event_tx, MonitorEvent::DiscoveryComplete { hosts });

        Ok(DiscoveryOutcome::Complete { hosts })
    }
}

struct DiscoveryWorker {
    shard: RangeInclusive<u8>,
    subnet: SubnetPrefix,
    ports: Arc<[u16]>,
    registry: HostRegistry,
    prober: Arc<dyn Prober>,
    event_tx: broadcast::Sender<MonitorEvent>,
    cancel: CancellationToken,
}

impl DiscoveryWorker {
    #[instrument(skip_all, fields(shard = ?self.shard))]
    async fn run(self) -> MonitorResult<usize> {
        let mut found = 0;

        for host in self.shard.clone() {
            if self.cancel.is_cancelled() {
                debug!("stopping before {}{host}", self.subnet);
                break;
            }

            let address = self.subnet.host(host);
            if !probe_any(self.prober.as_ref(), address, &self.ports).await {
                continue;
            }

            if let Some(entry) = self.registry.register(address, None).await? {
                found += 1;
                info!("found {} ({})", entry.address, entry.hostname);
                publish(
                    &self.event_tx,
                    MonitorEvent::HostDiscovered {
                        address: entry.address,
                        hostname: entry.hostname,
                    },
                );
            }
        }

        Ok(found)
    }
}
