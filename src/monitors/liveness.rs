//! Flap detection
//!
//! A host is only declared down after `threshold` consecutive failed rounds:
//!
//! ```text
//! reachable:
//!   any state                     → Up, failures reset to 0
//! unreachable (failures += 1):
//!   failures <  threshold         → Unstable
//!   failures >= threshold         → Down (alert only when entering Down)
//! ```

use crate::HostStatus;

pub const DEFAULT_FAIL_THRESHOLD: u32 = 3;

/// What a single round did to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvaluation {
    /// Was up, still up
    Ok,
    /// Came back after one or more failures
    BackToUp,
    /// Failed, but not often enough to be down
    Unstable,
    /// Just crossed the threshold
    GoesDown,
    /// Already down and failed again
    StillDown,
}

impl LivenessEvaluation {
    pub fn evaluate(
        reachable: bool,
        status: HostStatus,
        consecutive_failures: u32,
        threshold: u32,
    ) -> LivenessEvaluation {
        if reachable {
            if status == HostStatus::Up && consecutive_failures == 0 {
                return LivenessEvaluation::Ok;
            }
            return LivenessEvaluation::BackToUp;
        }

        if consecutive_failures.saturating_add(1) < threshold {
            return LivenessEvaluation::Unstable;
        }

        if status == HostStatus::Down {
            return LivenessEvaluation::StillDown;
        }

        LivenessEvaluation::GoesDown
    }

    /// Whether this evaluation must raise an alert
    pub fn is_alert(&self) -> bool {
        matches!(self, LivenessEvaluation::GoesDown)
    }
}

/// Status and failure counter of one host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub status: HostStatus,
    pub consecutive_failures: u32,
}

impl Liveness {
    /// State of a freshly discovered host
    pub fn up() -> Self {
        Self {
            status: HostStatus::Up,
            consecutive_failures: 0,
        }
    }

    /// Apply the result of one round
    pub fn advance(self, reachable: bool, threshold: u32) -> (Liveness, LivenessEvaluation) {
        let evaluation =
            LivenessEvaluation::evaluate(reachable, self.status, self.consecutive_failures, threshold);

        let next = match evaluation {
            LivenessEvaluation::Ok | LivenessEvaluation::BackToUp => Liveness::up(),
            LivenessEvaluation::Unstable => Liveness {
                status: HostStatus::Unstable,
                consecutive_failures: self.consecutive_failures.saturating_add(1),
            },
            LivenessEvaluation::GoesDown | LivenessEvaluation::StillDown => Liveness {
                status: HostStatus::Down,
                consecutive_failures: self.consecutive_failures.saturating_add(1),
            },
        };

        (next, evaluation)
    }
}
