// src/poll/scheduler.rs

//! Pure poll scheduler state machine.
//!
//! [`PollScheduler`] decides *whether* a fetch may be issued and *what*
//! happens once it completes. It owns no timer and performs no IO: the
//! async driver in `poll::driver` sleeps, fetches and reports back.
//! Keeping the transitions here means they can be tested without Tokio.
//!
//! State transitions:
//!
//! ```text
//! Idle --start--> Polling --complete(non-terminal)--> Armed --tick--> Polling
//!                    |                                  |
//!                    +--complete(terminal)--> Stopped <-+-- stop (from any state)
//! Stopped --restart--> Idle
//! ```
//!
//! Every fetch, scheduled or out-of-band, gets a sequence number from the same
//! counter. A completed response is only applied when it is newer than the
//! last applied one.

use tracing::debug;

use crate::errors::{MonitorError, Result};

use super::{PollDecision, PollState};

#[derive(Debug)]
pub struct PollScheduler {
    state: PollState,
    /// Last sequence number handed out.
    last_issued: u64,
    /// Sequence number of the newest response applied so far (0 = none).
    last_applied: u64,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            state: PollState::Idle,
            last_issued: 0,
            last_applied: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PollState::Stopped
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Begin polling. Only valid from `Idle`.
    ///
    /// Returns the sequence number of the immediate first fetch.
    pub fn start(&mut self) -> Result<u64> {
        if self.state != PollState::Idle {
            return Err(MonitorError::AlreadyStarted);
        }
        let seq = self.issue();
        self.state = PollState::Polling { seq };
        debug!(seq, "poll scheduler started");
        Ok(seq)
    }

    /// The delay timer fired.
    ///
    /// Consumes the armed timer and returns the sequence number for the
    /// scheduled fetch, or `None` if the timer is no longer armed (e.g. the
    /// scheduler was stopped while the timer was sleeping).
    pub fn tick(&mut self) -> Option<u64> {
        if self.state != PollState::Armed {
            debug!(state = ?self.state, "ignoring tick; no timer armed");
            return None;
        }
        let seq = self.issue();
        self.state = PollState::Polling { seq };
        Some(seq)
    }

    /// Hand out a sequence number for an out-of-band fetch (manual refresh).
    /// Does not touch the state.
    pub fn issue(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    /// Record a completed response and report whether it should be applied.
    ///
    /// Responses older than (or equal to) the last applied one are stale.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.last_applied {
            debug!(seq, last_applied = self.last_applied, "stale response");
            return false;
        }
        self.last_applied = seq;
        true
    }

    /// A scheduled fetch finished (successfully or not).
    ///
    /// `terminal` is whether the monitor's *current* view of the job is
    /// terminal after the response was applied or discarded.
    pub fn complete_poll(&mut self, seq: u64, terminal: bool) -> PollDecision {
        match self.state {
            PollState::Polling { seq: current } if current == seq => {
                if terminal {
                    self.state = PollState::Stopped;
                    PollDecision::Stop
                } else {
                    self.state = PollState::Armed;
                    PollDecision::ArmNext
                }
            }
            other => {
                debug!(seq, state = ?other, "completion for a poll that is no longer current");
                PollDecision::Ignore
            }
        }
    }

    /// An out-of-band fetch showed a terminal job.
    ///
    /// Disarms a pending timer. An in-flight scheduled fetch is left alone;
    /// its own completion will observe the terminal view and stop.
    /// Returns true if the scheduler transitioned to `Stopped`.
    pub fn observe_terminal(&mut self) -> bool {
        if self.state == PollState::Armed {
            self.state = PollState::Stopped;
            return true;
        }
        false
    }

    /// Stop from any state. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == PollState::Stopped {
            return false;
        }
        self.state = PollState::Stopped;
        true
    }

    /// Go back to `Idle` so that `start()` is accepted again.
    ///
    /// Sequence numbers keep counting, so responses issued before the restart
    /// can never overwrite newer state.
    pub fn restart(&mut self) -> Result<()> {
        if self.state != PollState::Stopped {
            return Err(MonitorError::NotStopped);
        }
        self.state = PollState::Idle;
        Ok(())
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}
