use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use lanwatch::{
    HostStatus,
    actors::{
        alert::{AlertHandle, TerminalBell},
        messages::MonitorEvent,
    },
    config::{Config, read_config_file},
    engine::{Engine, EngineOutcome},
    monitors::subnet::SubnetPrefix,
    registry::{HostRegistry, RegistrySnapshot},
    util::{get_config_path, get_log_level},
};
use tokio::{signal, spawn, sync::broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, instrument, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Discover the hosts of a /24 network and watch them for outages
#[derive(Debug, Clone, Parser)]
struct Args {
    /// Subnet prefix to scan, e.g. "192.168.1."
    subnet: Option<SubnetPrefix>,

    /// Config file
    #[arg(short, long)]
    file: Option<String>,

    /// Start with the alert bell muted (SIGUSR1 toggles it)
    #[arg(short, long)]
    mute: bool,
}

/// Source of mute toggle requests, SIGUSR1 on unix
#[cfg(unix)]
struct MuteToggle(signal::unix::Signal);

#[cfg(unix)]
impl MuteToggle {
    fn new() -> std::io::Result<Self> {
        signal::unix::signal(signal::unix::SignalKind::user_defined1()).map(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct MuteToggle;

#[cfg(not(unix))]
impl MuteToggle {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

fn init(level: Level) {
    let level = LevelFilter::from_level(level);
    let filter = filter::Targets::new().with_targets(vec![("lanwatch", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init(get_log_level());
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match args.file.clone().or_else(get_config_path) {
        Some(path) => read_config_file(&path)?,
        None => Config::default(),
    }
    .resolve()?;
    let mut toggle = MuteToggle::new()?;

    let cancel = CancellationToken::new();
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let registry = HostRegistry::new();

    let alerts = AlertHandle::spawn(Arc::new(TerminalBell), event_tx.subscribe(), cancel.clone());
    let display = spawn(present(
        registry.clone(),
        event_tx.subscribe(),
        cancel.clone(),
    ));
    let shutdown = spawn(wait_for_shutdown(cancel.clone()));

    let mut muted = args.mute;
    if muted {
        alerts.mute().await;
    }

    let engine = Engine::new(config, registry, event_tx, cancel.clone());
    let mut engine = spawn(engine.run(args.subnet));
    let result = loop {
        tokio::select! {
            result = &mut engine => break result,
            Some(()) = toggle.recv() => {
                muted = !muted;
                if muted {
                    info!("alerts muted");
                    alerts.mute().await;
                } else {
                    info!("alerts unmuted");
                    alerts.unmute().await;
                }
            }
        }
    };

    // the engine may also stop because of an error
    cancel.cancel();
    if let Err(e) = display.await {
        error!("display task failed: {e}");
    }
    let alerts_delivered = alerts.join().await;
    if let Err(e) = shutdown.await {
        error!("signal task failed: {e}");
    }
    debug!("{alerts_delivered} alerts delivered");

    match result?? {
        EngineOutcome::CancelledDuringDiscovery => info!("stopped during discovery"),
        EngineOutcome::Stopped { hosts, rounds } => {
            info!("stopped after {rounds} rounds over {hosts} hosts")
        }
    }

    Ok(())
}

async fn wait_for_shutdown(cancel: CancellationToken) {
    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("received interrupt, shutting down"),
                Err(e) => error!("failed to listen for interrupt: {e}"),
            }
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}

#[instrument(skip_all)]
async fn present(
    registry: HostRegistry,
    mut event_rx: broadcast::Receiver<MonitorEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = event_rx.recv() => event,
        };

        match event {
            Ok(MonitorEvent::HostDiscovered { address, hostname }) => {
                println!("+ {address:<15} {hostname}");
            }
            Ok(MonitorEvent::DiscoveryComplete { .. }) => {
                print_table(&registry.snapshot().await);
            }
            Ok(MonitorEvent::StatusChanged(change)) => {
                println!(
                    "{} {:<15} {:<24} {} -> {}",
                    change.timestamp.format("%H:%M:%S"),
                    change.address,
                    change.hostname,
                    change.previous,
                    change.current
                );
            }
            Ok(MonitorEvent::RoundComplete { round, summary }) => {
                let snapshot = registry.snapshot().await;
                let internet = snapshot
                    .sentinel()
                    .map_or(HostStatus::Scanning, |host| host.status);
                info!(
                    "round {round}: {} hosts, {} online, {} unstable, {} down, internet {internet}",
                    summary.total(),
                    summary.up,
                    summary.unstable,
                    summary.down
                );
            }
            Ok(MonitorEvent::Alert) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("display lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_table(snapshot: &RegistrySnapshot) {
    if let Some(subnet) = snapshot.subnet {
        println!("network {subnet}0/24");
    }
    println!("{:<15} {:<24} {}", "ADDRESS", "HOSTNAME", "STATUS");
    for host in &snapshot.hosts {
        println!("{:<15} {:<24} {}", host.address, host.hostname, host.status);
    }
}
