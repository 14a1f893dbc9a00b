/// Step timer: the single outstanding delayed step.
///
/// The game loop is single-threaded; "waiting" for the next step means the
/// loop polls `fire(now)` every frame. At most one step is ever pending:
/// `schedule` replaces the previous one and `cancel` drops it. Each pending
/// step carries the ticket of the attempt that scheduled it, so the owner can
/// refuse a step that belongs to an abandoned attempt.

use std::time::{Duration, Instant};

/// Delay between two committed steps. Animation cadence, not a tuning knob.
pub const STEP_DELAY: Duration = Duration::from_millis(400);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    due: Instant,
    ticket: u64,
}

#[derive(Debug)]
pub struct StepTimer {
    delay: Duration,
    pending: Option<Pending>,
}

impl StepTimer {
    pub fn new(delay: Duration) -> Self {
        StepTimer { delay, pending: None }
    }

    /// Arm the timer for `now + delay`, replacing any pending step.
    pub fn schedule(&mut self, now: Instant, ticket: u64) {
        self.pending = Some(Pending { due: now + self.delay, ticket });
    }

    /// Drop the pending step, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// If the pending step is due at `now`, disarm and return its ticket.
    pub fn fire(&mut self, now: Instant) -> Option<u64> {
        match self.pending {
            Some(p) if now >= p.due => {
                self.pending = None;
                Some(p.ticket)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        StepTimer::new(STEP_DELAY)
    }
}
