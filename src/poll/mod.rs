// src/poll/mod.rs

//! Polling for one execution.
//!
//! The pure state machine lives in [`scheduler`]; the async shell that owns
//! the delay timer and talks to the gateway lives in `driver`.

use std::time::Duration;

pub(crate) mod driver;
pub mod scheduler;

pub use scheduler::PollScheduler;

/// Delay between the completion of one poll and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(7);

/// Where the scheduler currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Not started (or restarted): no fetch in flight, no timer armed.
    Idle,
    /// A scheduled fetch is in flight.
    Polling { seq: u64 },
    /// Waiting for the delay timer.
    Armed,
    /// No further polling until `restart()`.
    Stopped,
}

/// What the driver should do after a scheduled fetch completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Sleep for the interval and poll again.
    ArmNext,
    /// The job is terminal; polling is over.
    Stop,
    /// The completion belongs to a poll that was stopped or superseded.
    Ignore,
}
