//! Ties subnet selection, discovery and monitoring together

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    actors::{
        discovery::{DiscoveryCoordinator, DiscoveryOutcome},
        messages::MonitorEvent,
        monitor::HostMonitor,
    },
    config::ResolvedConfig,
    error::MonitorResult,
    monitors::{
        probe::{Prober, TcpProber},
        subnet::{InterfaceSource, SubnetPrefix, SystemInterfaces, resolve_subnet},
    },
    registry::HostRegistry,
};

/// How the engine stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Shutdown arrived while discovery was still running
    CancelledDuringDiscovery,
    /// Shutdown arrived while monitoring
    Stopped { hosts: usize, rounds: u64 },
}

pub struct Engine {
    config: ResolvedConfig,
    registry: HostRegistry,
    prober: Arc<dyn Prober>,
    interfaces: Arc<dyn InterfaceSource>,
    event_tx: broadcast::Sender<MonitorEvent>,
    cancel: CancellationToken,
}

impl Engine {
    /// Engine probing over TCP and reading the system's interfaces
    pub fn new(
        config: ResolvedConfig,
        registry: HostRegistry,
        event_tx: broadcast::Sender<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let prober: Arc<dyn Prober> = Arc::new(TcpProber::new(config.connect_timeout));
        Self {
            config,
            registry,
            prober,
            interfaces: Arc::new(SystemInterfaces),
            event_tx,
            cancel,
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_interfaces(mut self, interfaces: Arc<dyn InterfaceSource>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Pick the subnet, discover it, then monitor until cancelled
    ///
    /// `subnet_override` is the prefix given on the command line.
    #[instrument(skip_all)]
    pub async fn run(self, subnet_override: Option<SubnetPrefix>) -> MonitorResult<EngineOutcome> {
        let subnet = resolve_subnet(
            subnet_override,
            self.config.subnet,
            self.interfaces.as_ref(),
            self.config.fallback_subnet,
        );
        self.registry.set_subnet(subnet).await;

        let coordinator = DiscoveryCoordinator::new(
            self.registry.clone(),
            Arc::clone(&self.prober),
            self.event_tx.clone(),
            self.cancel.clone(),
        );

        let hosts = match coordinator
            .discover(&self.config.discovery_plan(subnet))
            .await?
        {
            DiscoveryOutcome::Complete { hosts } => hosts,
            DiscoveryOutcome::Cancelled => return Ok(EngineOutcome::CancelledDuringDiscovery),
        };

        if self.cancel.is_cancelled() {
            return Ok(EngineOutcome::Stopped { hosts, rounds: 0 });
        }

        info!(
            "monitoring {hosts} hosts every {}s",
            self.config.interval.as_secs_f32()
        );
        let rounds = HostMonitor::new(
            self.registry,
            self.prober,
            self.config.monitor_settings(),
            self.event_tx,
            self.cancel,
        )
        .run()
        .await;

        Ok(EngineOutcome::Stopped { hosts, rounds })
    }
}
