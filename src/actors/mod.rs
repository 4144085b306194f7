//! Tasks that do the actual work
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  Engine (main)   │
//!                 └────────┬─────────┘
//!          phase 1         │         phase 2
//!        ┌─────────────────┴───────────────┐
//!        │                                 │
//! ┌──────▼────────────┐            ┌───────▼──────┐
//! │ DiscoveryCoordin. │            │ HostMonitor  │
//! │  worker 1..N      │            │ (round loop) │
//! └──────┬────────────┘            └───────┬──────┘
//!        │ register                        │ update_status
//!        └──────────► HostRegistry ◄───────┘
//!                          │
//!                  Broadcast Channel (MonitorEvent)
//!                          │ subscribe
//!              ┌───────────┴───────────┐
//!              │                       │
//!        ┌─────▼──────┐        ┌───────▼──────┐
//!        │ AlertActor │        │ presentation │
//!        └────────────┘        └──────────────┘
//! ```
//!
//! All tasks share one cancellation token and return at their next
//! checkpoint once it is raised.

pub mod alert;
pub mod discovery;
pub mod messages;
pub mod monitor;

use tokio::sync::broadcast;
use tracing::trace;

use messages::MonitorEvent;

/// Publish an event, ignoring the case where nobody listens
pub(crate) fn publish(event_tx: &broadcast::Sender<MonitorEvent>, event: MonitorEvent) {
    if let Err(e) = event_tx.send(event) {
        trace!("no subscriber for {:?}", e.0);
    }
}
