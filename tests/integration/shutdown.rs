//! Shutdown latency during discovery and monitoring

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use lanwatch::{
    actors::{
        alert::{AlertHandle, LogAlertSink},
        discovery::{DiscoveryCoordinator, DiscoveryOutcome},
    },
    config::ResolvedConfig,
    engine::{Engine, EngineOutcome},
    monitors::subnet::SubnetPrefix,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::helpers::*;

const PROBE_DELAY: Duration = Duration::from_millis(20);

#[tokio::test]
async fn test_cancel_during_discovery_returns_quickly() {
    let registry = test_registry();
    let prober = ScriptedProber::slow(80, Vec::<Ipv4Addr>::new(), PROBE_DELAY);
    let (event_tx, _) = broadcast::channel(64);
    let cancel = CancellationToken::new();

    let coordinator =
        DiscoveryCoordinator::new(registry.clone(), prober.clone(), event_tx, cancel.clone());
    let task = tokio::spawn(async move {
        coordinator
            .discover(&test_plan(SubnetPrefix::new(10, 0, 0), 4))
            .await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    // every worker finishes at most its current host
    let outcome = tokio::time::timeout(Duration::from_millis(500), task)
        .await
        .expect("discovery should stop promptly")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, DiscoveryOutcome::Cancelled);
    assert!(prober.probes() < 254 * 3);
    assert!(!registry.is_discovery_complete().await);
}

#[tokio::test]
async fn test_engine_and_alerts_stop_together() {
    let registry = test_registry();
    let (event_tx, _) = broadcast::channel(256);
    let cancel = CancellationToken::new();
    let prober = ScriptedProber::new(80, [Ipv4Addr::new(10, 9, 9, 1)]);

    let alerts = AlertHandle::spawn(
        Arc::new(LogAlertSink),
        event_tx.subscribe(),
        cancel.clone(),
    );

    let config = ResolvedConfig {
        interval: Duration::from_secs(60),
        ..Default::default()
    };
    let engine = Engine::new(config, registry.clone(), event_tx, cancel.clone())
        .with_prober(prober);
    let task = tokio::spawn(engine.run(Some(SubnetPrefix::new(10, 9, 9))));

    registry.discovery_completed().await;
    // let the first round finish, then cancel during the long wait
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_millis(500), task)
        .await
        .expect("engine should stop promptly")
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, EngineOutcome::Stopped { hosts: 2, .. }));

    let delivered = tokio::time::timeout(Duration::from_millis(500), alerts.join())
        .await
        .expect("alert actor should stop promptly");
    assert_eq!(delivered, 0);
}
