// src/poll/driver.rs

//! Async shell around [`PollScheduler`].
//!
//! The driver owns everything the pure scheduler does not:
//! - the delay timer (one spawned Tokio task per armed polling loop),
//! - calls to the [`ExecutionGateway`],
//! - applying responses to the shared snapshot,
//! - best-effort notifications to the caller.
//!
//! Shared state sits behind a `std::sync::Mutex` that is never held across
//! an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{GatewayError, MonitorError, Result};
use crate::gateway::ExecutionGateway;
use crate::model::{Execution, ExecutionId, Task};
use crate::monitor::{ApplyOutcome, MonitorEvent, Snapshot, StopReason};

use super::{PollDecision, PollScheduler};

/// Monitor state shared between the façade and the background poll loop.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) scheduler: PollScheduler,
    pub(crate) execution_id: Option<ExecutionId>,
    pub(crate) snapshot: Option<Snapshot>,
    pub(crate) disposed: bool,
    /// A stop request is on its way to the server.
    pub(crate) stop_pending: bool,
    /// Cancels the sleeping timer of the current poll loop.
    timer: Option<oneshot::Sender<()>>,
}

impl Shared {
    fn cancel_timer(&mut self) {
        if let Some(cancel) = self.timer.take() {
            // The loop may already be gone; nothing to cancel then.
            let _ = cancel.send(());
        }
    }
}

/// Clears [`Shared::stop_pending`] when the stop request finishes or its
/// future is dropped.
pub(crate) struct StopGuard {
    shared: Arc<Mutex<Shared>>,
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.stop_pending = false;
    }
}

/// Handle to the gateway and shared state; cheap to clone into the poll loop.
pub(crate) struct PollDriver<G> {
    gateway: Arc<G>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::Sender<MonitorEvent>,
    interval: Duration,
}

impl<G> Clone for PollDriver<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            interval: self.interval,
        }
    }
}

type Fetched = std::result::Result<(Execution, Vec<Task>), GatewayError>;

impl<G: ExecutionGateway + 'static> PollDriver<G> {
    pub(crate) fn new(
        gateway: Arc<G>,
        events: mpsc::Sender<MonitorEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            shared: Arc::new(Mutex::new(Shared::default())),
            events,
            interval,
        }
    }

    pub(crate) fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a stop request as in flight. The caller must already hold the
    /// lock and have checked that no other stop is pending.
    pub(crate) fn begin_stop(&self, shared: &mut Shared) -> StopGuard {
        shared.stop_pending = true;
        StopGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    fn emit(&self, event: MonitorEvent) {
        if let Err(err) = self.events.try_send(event) {
            debug!(error = %err, "dropping monitor notification");
        }
    }

    /// Execution and tasks are always fetched together so that the status
    /// and the counts never drift apart by more than one poll.
    async fn fetch(&self, id: &ExecutionId) -> Fetched {
        let execution = self.gateway.fetch_execution(id).await?;
        let tasks = self.gateway.fetch_tasks(id).await?;
        Ok((execution, tasks))
    }

    /// Bind to `id`, move the scheduler out of `Idle`, run the immediate first
    /// poll and arm the timer if the job is still going.
    pub(crate) async fn start(&self, id: ExecutionId) -> Result<()> {
        let seq = {
            let mut shared = self.lock();
            if shared.disposed {
                return Err(MonitorError::Disposed);
            }
            let seq = shared.scheduler.start()?;
            shared.execution_id = Some(id.clone());
            seq
        };

        info!(execution = %id, seq, "monitoring execution");
        self.first_poll(id, seq).await;
        Ok(())
    }

    /// `Stopped -> Idle -> Polling` for the execution already bound.
    pub(crate) async fn restart(&self) -> Result<()> {
        let (id, seq) = {
            let mut shared = self.lock();
            if shared.disposed {
                return Err(MonitorError::Disposed);
            }
            let id = shared.execution_id.clone().ok_or(MonitorError::NotStarted)?;
            shared.scheduler.restart()?;
            let seq = shared.scheduler.start()?;
            (id, seq)
        };

        info!(execution = %id, seq, "restarting poll scheduler");
        self.first_poll(id, seq).await;
        Ok(())
    }

    async fn first_poll(&self, id: ExecutionId, seq: u64) {
        let fetched = self.fetch(&id).await;
        if self.finish_poll(seq, fetched) == PollDecision::ArmNext {
            self.arm();
        }
    }

    /// Spawn the timer loop for the current `Armed` state.
    fn arm(&self) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut shared = self.lock();
            if shared.disposed || shared.scheduler.is_stopped() {
                return;
            }
            shared.cancel_timer();
            shared.timer = Some(cancel_tx);
        }

        let driver = self.clone();
        tokio::spawn(async move { driver.poll_loop(cancel_rx).await });
    }

    async fn poll_loop(self, mut cancel_rx: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut cancel_rx => {
                    debug!("poll timer cancelled");
                    return;
                }
            }

            let Some((id, seq)) = self.begin_tick() else {
                return;
            };

            debug!(execution = %id, seq, "poll tick");
            let fetched = self.fetch(&id).await;

            match self.finish_poll(seq, fetched) {
                PollDecision::ArmNext => continue,
                PollDecision::Stop | PollDecision::Ignore => return,
            }
        }
    }

    fn begin_tick(&self) -> Option<(ExecutionId, u64)> {
        let mut shared = self.lock();
        if shared.disposed {
            return None;
        }
        let id = shared.execution_id.clone()?;
        let seq = shared.scheduler.tick()?;
        Some((id, seq))
    }

    /// Hand a scheduled fetch back to the scheduler and decide what's next.
    fn finish_poll(&self, seq: u64, fetched: Fetched) -> PollDecision {
        let mut shared = self.lock();
        if shared.disposed {
            debug!(seq, "monitor disposed; dropping poll response");
            return PollDecision::Ignore;
        }

        match fetched {
            Ok((execution, tasks)) => {
                self.apply(&mut shared, seq, execution, tasks);
            }
            Err(err) => {
                warn!(seq, error = %err, "poll failed; keeping last snapshot");
                self.emit(MonitorEvent::FetchFailed {
                    seq,
                    error: err.to_string(),
                });
            }
        }

        let terminal = shared.snapshot.as_ref().is_some_and(Snapshot::is_terminal);
        let decision = shared.scheduler.complete_poll(seq, terminal);
        if decision == PollDecision::Stop {
            shared.timer = None;
            info!(seq, "execution reached a terminal state; polling stopped");
            self.emit(MonitorEvent::Stopped {
                reason: StopReason::Terminal,
            });
        }
        decision
    }

    fn apply(
        &self,
        shared: &mut Shared,
        seq: u64,
        execution: Execution,
        tasks: Vec<Task>,
    ) -> ApplyOutcome {
        if !shared.scheduler.accept(seq) {
            self.emit(MonitorEvent::StaleDiscarded { seq });
            return ApplyOutcome::StaleDiscarded;
        }

        let snapshot = Snapshot::new(execution, tasks, seq);
        let terminal = snapshot.is_terminal();
        debug!(
            seq,
            status = %snapshot.status(),
            tasks = snapshot.tasks.len(),
            in_progress = snapshot.metrics.in_progress(),
            terminal,
            "applied snapshot"
        );
        shared.snapshot = Some(snapshot);
        self.emit(MonitorEvent::Updated { seq, terminal });
        ApplyOutcome::Applied
    }

    /// Out-of-band fetch. Leaves the timer alone unless the fresh view is
    /// terminal while a timer is armed, in which case polling stops.
    pub(crate) async fn refresh(&self) -> Result<ApplyOutcome> {
        let (id, seq) = {
            let mut shared = self.lock();
            if shared.disposed {
                return Err(MonitorError::Disposed);
            }
            let id = shared.execution_id.clone().ok_or(MonitorError::NotStarted)?;
            (id, shared.scheduler.issue())
        };

        debug!(execution = %id, seq, "manual refresh");
        let fetched = self.fetch(&id).await;

        let mut shared = self.lock();
        if shared.disposed {
            debug!(seq, "monitor disposed; dropping refresh response");
            return Ok(ApplyOutcome::Dropped);
        }

        let (execution, tasks) = match fetched {
            Ok(parts) => parts,
            Err(err) => {
                warn!(seq, error = %err, "refresh failed; keeping last snapshot");
                self.emit(MonitorEvent::FetchFailed {
                    seq,
                    error: err.to_string(),
                });
                return Err(MonitorError::TransientFetch(err));
            }
        };

        let outcome = self.apply(&mut shared, seq, execution, tasks);
        let terminal = shared.snapshot.as_ref().is_some_and(Snapshot::is_terminal);
        if outcome == ApplyOutcome::Applied && terminal && shared.scheduler.observe_terminal() {
            shared.cancel_timer();
            info!(seq, "refresh observed a terminal state; polling stopped");
            self.emit(MonitorEvent::Stopped {
                reason: StopReason::Terminal,
            });
        }
        Ok(outcome)
    }

    /// Stop polling, keep the snapshot.
    pub(crate) fn stop(&self) {
        let mut shared = self.lock();
        shared.cancel_timer();
        if shared.scheduler.stop() {
            info!("polling stopped on request");
            self.emit(MonitorEvent::Stopped {
                reason: StopReason::Requested,
            });
        }
    }

    /// Stop polling and release all state. Idempotent.
    pub(crate) fn dispose(&self) {
        let mut shared = self.lock();
        if shared.disposed {
            return;
        }
        shared.disposed = true;
        shared.cancel_timer();
        shared.scheduler.stop();
        shared.snapshot = None;
        let id = shared.execution_id.take();
        debug!(execution = ?id.as_ref().map(ExecutionId::as_str), "monitor disposed");
        self.emit(MonitorEvent::Stopped {
            reason: StopReason::Disposed,
        });
    }
}
