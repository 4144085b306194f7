//! HostMonitor - re-probes every known host on a fixed cadence
//!
//! Each round probes the hosts in registry order and feeds the result into the
//! flap detection of [`crate::monitors::liveness`]. Status changes are
//! published as events; entering `Down` additionally publishes an alert.
//!
//! ## Message Flow
//!
//! ```text
//! round: for each host → probe_any → update_status → [StatusChanged, Alert]
//!        → RoundComplete
//! wait:  interval timer ⟷ cancellation
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    HostStatus, StatusSummary,
    monitors::{
        liveness::DEFAULT_FAIL_THRESHOLD,
        probe::{COMMON_PORTS, Prober, probe_any},
    },
    registry::HostRegistry,
};

use super::{messages::MonitorEvent, publish};

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Pause between the end of one round and the start of the next
    pub interval: Duration,
    /// Consecutive failed rounds before a host is down
    pub fail_threshold: u32,
    pub ports: Vec<u16>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            ports: COMMON_PORTS.to_vec(),
        }
    }
}

/// How a single round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Completed(StatusSummary),
    Cancelled,
}

/// Monitoring loop over the sealed registry
pub struct HostMonitor {
    registry: HostRegistry,
    prober: Arc<dyn Prober>,
    settings: MonitorSettings,
    event_tx: broadcast::Sender<MonitorEvent>,
    cancel: CancellationToken,
    round: u64,
}

impl HostMonitor {
    pub fn new(
        registry: HostRegistry,
        prober: Arc<dyn Prober>,
        settings: MonitorSettings,
        event_tx: broadcast::Sender<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            prober,
            settings,
            event_tx,
            cancel,
            round: 0,
        }
    }

    /// Run rounds until cancelled
    ///
    /// The first round starts right away. Returns the number of completed
    /// rounds.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> u64 {
        debug!("starting host monitor");

        loop {
            if self.sweep().await == RoundOutcome::Cancelled {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.settings.interval) => {}
            }
        }

        debug!("host monitor stopped after {} rounds", self.round);
        self.round
    }

    /// Probe every registered host once
    ///
    /// Cancellation is checked between hosts; a host whose probe already
    /// started is finished first.
    pub async fn sweep(&mut self) -> RoundOutcome {
        let addresses = self.registry.addresses().await;
        trace!("round {}: probing {} hosts", self.round + 1, addresses.len());

        for (index, address) in addresses.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                debug!("round {} cancelled before {address}", self.round + 1);
                return RoundOutcome::Cancelled;
            }

            let reachable = probe_any(self.prober.as_ref(), address, &self.settings.ports).await;

            let Some(change) = self
                .registry
                .update_status(index, reachable, self.settings.fail_threshold)
                .await
            else {
                continue;
            };

            match change.current {
                HostStatus::Down => warn!(
                    "{} ({}) is DOWN after {} failed rounds",
                    change.address, change.hostname, change.consecutive_failures
                ),
                HostStatus::Up => info!(
                    "{} ({}) is back online",
                    change.address, change.hostname
                ),
                _ => debug!(
                    "{} ({}): {} -> {}",
                    change.address, change.hostname, change.previous, change.current
                ),
            }

            let alert = change.alert;
            publish(&self.event_tx, MonitorEvent::StatusChanged(change));
            if alert {
                publish(&self.event_tx, MonitorEvent::Alert);
            }
        }

        self.round += 1;
        let summary = self.registry.snapshot().await.summary();
        debug!(
            "round {}: {} up, {} unstable, {} down",
            self.round, summary.up, summary.unstable, summary.down
        );
        publish(
            &self.event_tx,
            MonitorEvent::RoundComplete {
                round: self.round,
                summary,
            },
        );

        RoundOutcome::Completed(summary)
    }
}
