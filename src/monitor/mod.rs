// src/monitor/mod.rs

//! Execution monitor façade.
//!
//! [`ExecutionMonitor`] tracks one execution: it fetches the execution and its
//! tasks, keeps the latest [`Snapshot`], polls until the job is terminal and
//! exposes the derived numbers a list or detail view needs.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use execwatch::monitor::{ExecutionMonitor, MonitorOptions};
//! # async fn demo<G: execwatch::gateway::ExecutionGateway + 'static>(gateway: Arc<G>) -> execwatch::errors::Result<()> {
//! let (monitor, mut events) = ExecutionMonitor::new(gateway, MonitorOptions::default());
//! monitor.start("42").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}: {} in progress", monitor.in_progress_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Dropping the monitor disposes it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::{MonitorError, Result};
use crate::gateway::ExecutionGateway;
use crate::model::ExecutionId;
use crate::poll::driver::PollDriver;
use crate::poll::{PollState, DEFAULT_POLL_INTERVAL};

pub mod snapshot;

pub use snapshot::{format_duration, format_summary, ApplyOutcome, Snapshot};

/// Default capacity of the notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Tunables for one monitor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Fixed delay between the end of one poll and the start of the next.
    pub poll_interval: Duration,
    pub event_capacity: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Why polling ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Terminal,
    Requested,
    Disposed,
}

/// Best-effort notifications sent to the monitor's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A fetch was applied as the new snapshot.
    Updated { seq: u64, terminal: bool },
    /// A fetch failed; the previous snapshot is still current.
    FetchFailed { seq: u64, error: String },
    /// A response arrived after a newer one and was dropped.
    StaleDiscarded { seq: u64 },
    Stopped { reason: StopReason },
}

pub struct ExecutionMonitor<G: ExecutionGateway + 'static> {
    driver: PollDriver<G>,
}

impl<G: ExecutionGateway + 'static> fmt::Debug for ExecutionMonitor<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.driver.lock();
        f.debug_struct("ExecutionMonitor")
            .field("execution_id", &shared.execution_id)
            .field("state", &shared.scheduler.state())
            .field("disposed", &shared.disposed)
            .finish_non_exhaustive()
    }
}

impl<G: ExecutionGateway + 'static> ExecutionMonitor<G> {
    /// Create an idle monitor and the receiver for its notifications.
    pub fn new(gateway: Arc<G>, options: MonitorOptions) -> (Self, mpsc::Receiver<MonitorEvent>) {
        let (tx, rx) = mpsc::channel(options.event_capacity.max(1));
        let driver = PollDriver::new(gateway, tx, options.poll_interval);
        (Self { driver }, rx)
    }

    /// Begin tracking `id`.
    ///
    /// Returns once the first fetch has completed (successfully or not). A
    /// failed first fetch is reported as [`MonitorEvent::FetchFailed`] and
    /// retried on the normal interval.
    pub async fn start(&self, id: impl Into<ExecutionId>) -> Result<()> {
        self.driver.start(id.into()).await
    }

    /// Fetch now, without touching the poll timer.
    pub async fn refresh(&self) -> Result<ApplyOutcome> {
        self.driver.refresh().await
    }

    /// Whether [`cancel`](Self::cancel) would send a stop request: the last
    /// snapshot shows the job in progress and no stop is already in flight.
    pub fn can_cancel(&self) -> bool {
        let shared = self.driver.lock();
        !shared.disposed && !shared.stop_pending && in_progress(shared.snapshot.as_ref())
    }

    /// Ask the server to stop the execution, then refresh once.
    ///
    /// Rejected with [`MonitorError::NotCancellable`] unless the current
    /// snapshot is in progress, and with [`MonitorError::StopPending`] while
    /// another stop request is in flight. A failing stop request is returned
    /// as [`MonitorError::Cancel`] and leaves polling as it was. A failing
    /// follow-up refresh is only reported through the notification channel.
    pub async fn cancel(&self) -> Result<()> {
        let (id, pending) = {
            let mut shared = self.driver.lock();
            if shared.disposed {
                return Err(MonitorError::Disposed);
            }
            let id = shared.execution_id.clone().ok_or(MonitorError::NotStarted)?;
            if shared.stop_pending {
                return Err(MonitorError::StopPending);
            }
            if !in_progress(shared.snapshot.as_ref()) {
                return Err(MonitorError::NotCancellable);
            }
            let pending = self.driver.begin_stop(&mut shared);
            (id, pending)
        };

        let stopped = self.driver.gateway().stop_execution(&id).await;
        drop(pending);
        stopped.map_err(|err| {
            warn!(execution = %id, error = %err, "stop request failed");
            MonitorError::Cancel(err)
        })?;
        info!(execution = %id, "stop requested");

        if let Err(err) = self.driver.refresh().await {
            warn!(execution = %id, error = %err, "refresh after stop failed");
        }
        Ok(())
    }

    /// Stop polling but keep the last snapshot.
    pub fn stop(&self) {
        self.driver.stop();
    }

    /// Resume polling after [`stop`](Self::stop) or a terminal state.
    pub async fn restart(&self) -> Result<()> {
        self.driver.restart().await
    }

    /// Stop polling and release all state. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.driver.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.driver.lock().disposed
    }

    pub fn poll_state(&self) -> PollState {
        self.driver.lock().scheduler.state()
    }

    pub fn execution_id(&self) -> Option<ExecutionId> {
        self.driver.lock().execution_id.clone()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.driver.lock().snapshot.clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> Option<T> {
        self.driver.lock().snapshot.as_ref().map(f)
    }

    pub fn is_terminal(&self) -> bool {
        self.read(Snapshot::is_terminal).unwrap_or(false)
    }

    pub fn success_count(&self) -> usize {
        self.read(|s| s.metrics.succeeded).unwrap_or(0)
    }

    pub fn failed_count(&self) -> usize {
        self.read(|s| s.metrics.failed).unwrap_or(0)
    }

    pub fn in_progress_count(&self) -> usize {
        self.read(|s| s.metrics.in_progress()).unwrap_or(0)
    }

    pub fn stopped_count(&self) -> usize {
        self.read(|s| s.metrics.stopped).unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.read(|s| s.metrics.total()).unwrap_or(0)
    }

    /// Elapsed time of the tracked execution; `None` before the first
    /// snapshot or when the server has no start time.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.duration_at(Utc::now())
    }

    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.read(|s| s.duration_at(now)).flatten()
    }
}

fn in_progress(snapshot: Option<&Snapshot>) -> bool {
    snapshot.is_some_and(|s| !s.is_terminal())
}

impl<G: ExecutionGateway + 'static> Drop for ExecutionMonitor<G> {
    fn drop(&mut self) {
        self.driver.dispose();
    }
}
