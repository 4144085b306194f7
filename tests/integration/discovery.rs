//! Discovery over a scripted network

use std::net::Ipv4Addr;

use assert_matches::assert_matches;
use lanwatch::{
    HostStatus, INTERNET_HOSTNAME,
    actors::{
        discovery::{DiscoveryCoordinator, DiscoveryOutcome},
        messages::MonitorEvent,
    },
    error::MonitorError,
    monitors::subnet::SubnetPrefix,
    registry::{HostRegistry, RegistrySnapshot},
};
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

const SUBNET: SubnetPrefix = SubnetPrefix::new(10, 0, 0);

async fn discover(workers: usize, alive: &[Ipv4Addr]) -> (HostRegistry, Vec<Ipv4Addr>) {
    let registry = test_registry();
    let prober = ScriptedProber::new(80, alive.iter().copied().chain([INTERNET]));
    let (event_tx, _) = broadcast::channel(512);

    let coordinator = DiscoveryCoordinator::new(
        registry.clone(),
        prober.clone(),
        event_tx,
        CancellationToken::new(),
    );
    let outcome = coordinator
        .discover(&test_plan(SUBNET, workers))
        .await
        .unwrap();
    assert_matches!(outcome, DiscoveryOutcome::Complete { .. });

    (registry, prober.visited())
}

fn summarize(snapshot: &RegistrySnapshot) -> Vec<(Ipv4Addr, String, HostStatus, bool)> {
    snapshot
        .hosts
        .iter()
        .map(|host| (host.address, host.hostname.clone(), host.status, host.sentinel))
        .collect()
}

#[tokio::test]
async fn test_discovered_hosts_are_sorted_with_sentinel_last() {
    let alive = [Ipv4Addr::new(10, 0, 0, 50), Ipv4Addr::new(10, 0, 0, 1)];
    let (registry, _) = discover(50, &alive).await;

    let snapshot = registry.snapshot().await;
    assert!(snapshot.discovery_complete);
    assert_eq!(
        summarize(&snapshot),
        vec![
            (Ipv4Addr::new(10, 0, 0, 1), "N/A".to_string(), HostStatus::Up, false),
            (Ipv4Addr::new(10, 0, 0, 50), "N/A".to_string(), HostStatus::Up, false),
            (INTERNET, INTERNET_HOSTNAME.to_string(), HostStatus::Up, true),
        ]
    );
}

#[tokio::test]
async fn test_single_worker_matches_worker_pool() {
    let alive = [
        Ipv4Addr::new(10, 0, 0, 254),
        Ipv4Addr::new(10, 0, 0, 7),
        Ipv4Addr::new(10, 0, 0, 128),
    ];

    let (single, single_visits) = discover(1, &alive).await;
    let (pool, pool_visits) = discover(50, &alive).await;

    assert_eq!(
        summarize(&single.snapshot().await),
        summarize(&pool.snapshot().await)
    );

    let expected: Vec<_> = (1..=254).map(|host| SUBNET.host(host)).collect();
    for mut visits in [single_visits, pool_visits] {
        visits.sort_by_key(|address| u32::from(*address));
        assert_eq!(visits, expected);
    }
}

#[tokio::test]
async fn test_more_workers_than_hosts() {
    let registry = test_registry();
    let prober = ScriptedProber::new(80, [SUBNET.host(2)]);
    let (event_tx, _) = broadcast::channel(64);

    let mut plan = test_plan(SUBNET, 50);
    plan.last_host = 3;

    let coordinator =
        DiscoveryCoordinator::new(registry.clone(), prober.clone(), event_tx, CancellationToken::new());
    let outcome = coordinator.discover(&plan).await.unwrap();

    // the sentinel is registered even though it does not answer
    assert_eq!(outcome, DiscoveryOutcome::Complete { hosts: 2 });
    assert_eq!(prober.visited().len(), 3);
}

#[tokio::test]
async fn test_concurrent_registration_keeps_addresses_unique() {
    let registry = test_registry();
    let address = Ipv4Addr::new(10, 0, 0, 9);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.register(address, None).await })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_registry_is_sealed_after_discovery() {
    let (registry, _) = discover(50, &[Ipv4Addr::new(10, 0, 0, 1)]).await;

    let late = Ipv4Addr::new(10, 0, 0, 2);
    assert_matches!(
        registry.register(late, None).await,
        Err(MonitorError::RegistrySealed(address)) if address == late
    );
}

#[tokio::test]
async fn test_discovery_events() {
    let registry = test_registry();
    let prober = ScriptedProber::new(80, [Ipv4Addr::new(10, 0, 0, 1), INTERNET]);
    let (event_tx, mut event_rx) = broadcast::channel(64);

    let waiter = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.discovery_completed().await })
    };

    DiscoveryCoordinator::new(registry, prober, event_tx, CancellationToken::new())
        .discover(&test_plan(SUBNET, 10))
        .await
        .unwrap();
    waiter.await.unwrap();

    let events = drain(&mut event_rx);
    assert_eq!(
        events,
        vec![
            MonitorEvent::HostDiscovered {
                address: Ipv4Addr::new(10, 0, 0, 1),
                hostname: "N/A".to_string(),
            },
            MonitorEvent::HostDiscovered {
                address: INTERNET,
                hostname: INTERNET_HOSTNAME.to_string(),
            },
            MonitorEvent::DiscoveryComplete { hosts: 2 },
        ]
    );
}
