//! AlertActor - forwards down alerts to an alert sink
//!
//! The monitor loop publishes [`MonitorEvent::Alert`] exactly once per host
//! that goes down. This actor listens on the event channel and hands every
//! alert to the configured [`AlertSink`] unless alerts are muted.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use super::messages::{AlertCommand, MonitorEvent};

/// Receiver of payload-free alerts
pub trait AlertSink: Send + Sync {
    fn alert(&self);
}

/// Rings the terminal bell on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn alert(&self) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
            debug!("failed to ring terminal bell: {e}");
        }
    }
}

/// Only writes a log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self) {
        warn!("a host went down");
    }
}

pub struct AlertActor {
    sink: Arc<dyn AlertSink>,
    command_rx: mpsc::Receiver<AlertCommand>,
    event_rx: broadcast::Receiver<MonitorEvent>,
    cancel: CancellationToken,
    muted: bool,
    /// Alerts handed to the sink so far
    delivered: u64,
}

impl AlertActor {
    pub fn new(
        sink: Arc<dyn AlertSink>,
        command_rx: mpsc::Receiver<AlertCommand>,
        event_rx: broadcast::Receiver<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            command_rx,
            event_rx,
            cancel,
            muted: false,
            delivered: 0,
        }
    }

    /// Run until shutdown, cancellation or until the event channel closes
    ///
    /// Returns the number of alerts delivered to the sink.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> u64 {
        debug!("starting alert actor");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("cancelled");
                    break;
                }

                result = self.event_rx.recv() => {
                    match result {
                        Ok(MonitorEvent::Alert) => self.handle_alert(),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("alert actor lagged, skipped {skipped} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("event channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AlertCommand::Mute => {
                            debug!("muting alerts");
                            self.muted = true;
                        }
                        AlertCommand::Unmute => {
                            debug!("unmuting alerts");
                            self.muted = false;
                        }
                        AlertCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("alert actor stopped");
        self.delivered
    }

    fn handle_alert(&mut self) {
        if self.muted {
            trace!("alert suppressed, muted");
            return;
        }

        self.delivered += 1;
        self.sink.alert();
    }
}

/// Handle for controlling an AlertActor
pub struct AlertHandle {
    sender: mpsc::Sender<AlertCommand>,
    task: JoinHandle<u64>,
}

impl AlertHandle {
    /// Spawn a new alert actor listening on `event_rx`
    pub fn spawn(
        sink: Arc<dyn AlertSink>,
        event_rx: broadcast::Receiver<MonitorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let actor = AlertActor::new(sink, cmd_rx, event_rx, cancel);

        Self {
            sender: cmd_tx,
            task: tokio::spawn(actor.run()),
        }
    }

    pub async fn mute(&self) {
        let _ = self.sender.send(AlertCommand::Mute).await;
    }

    pub async fn unmute(&self) {
        let _ = self.sender.send(AlertCommand::Unmute).await;
    }

    /// Stop the actor and wait for it
    ///
    /// Returns the number of alerts that reached the sink.
    pub async fn shutdown(self) -> u64 {
        let _ = self.sender.send(AlertCommand::Shutdown).await;
        self.join().await
    }

    /// Wait for the actor to stop on its own (cancellation or closed channel)
    pub async fn join(self) -> u64 {
        match self.task.await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("alert actor failed: {e}");
                0
            }
        }
    }
}
