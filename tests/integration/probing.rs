//! Probing against real sockets

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use lanwatch::monitors::probe::{ProbeOutcome, TcpProber, probe_any};
use tokio::net::TcpListener;

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port that had a listener a moment ago and is closed now
async fn closed_port() -> u16 {
    let (listener, port) = listener().await;
    drop(listener);
    port
}

#[tokio::test]
async fn test_first_open_port_wins() {
    let (_listener, open) = listener().await;
    let closed = closed_port().await;

    let prober = TcpProber::default();
    assert!(probe_any(&prober, Ipv4Addr::LOCALHOST, &[closed, open]).await);
    assert!(!probe_any(&prober, Ipv4Addr::LOCALHOST, &[closed]).await);
}

#[tokio::test]
async fn test_unroutable_address_is_bounded_by_timeout() {
    let prober = TcpProber::new(Duration::from_millis(200));

    let started = Instant::now();
    let outcome = prober.check(Ipv4Addr::new(10, 255, 255, 1), 80).await;
    let elapsed = started.elapsed();

    // depending on the host either nothing answers or the route is rejected
    assert!(!outcome.is_reachable(), "unexpected {outcome:?}");
    assert!(elapsed < Duration::from_millis(200) + Duration::from_millis(300));
}

#[tokio::test]
async fn test_refused_connection_is_not_reachable() {
    let port = closed_port().await;
    let outcome = TcpProber::default().check(Ipv4Addr::LOCALHOST, port).await;
    assert_eq!(outcome, ProbeOutcome::Refused);
}

#[tokio::test]
async fn test_empty_port_list_is_unreachable() {
    let prober = TcpProber::default();
    assert!(!probe_any(&prober, Ipv4Addr::LOCALHOST, &[]).await);
}
