// src/monitor/snapshot.rs

//! The monitor's local copy of an execution and its tasks, plus the derived
//! values the UI reads from it.

use chrono::{DateTime, Duration, Utc};

use crate::metrics::{aggregate, is_execution_in_progress, rollup_status, Metrics};
use crate::model::{elapsed, Execution, Task};
use crate::status::Status;

/// Result of handing a completed fetch to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The response became the current snapshot.
    Applied,
    /// A newer response had already been applied; this one was dropped.
    StaleDiscarded,
    /// The monitor was disposed while the fetch was in flight.
    Dropped,
}

/// Execution and tasks as of one applied fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub execution: Execution,
    pub tasks: Vec<Task>,
    pub metrics: Metrics,
    /// Sequence number of the fetch that produced this snapshot.
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, replacing whatever metrics the server embedded with
    /// counts aggregated from `tasks`.
    pub fn new(mut execution: Execution, tasks: Vec<Task>, seq: u64) -> Self {
        let metrics = aggregate(&tasks);
        execution.metrics = metrics;
        Self {
            execution,
            tasks,
            metrics,
            seq,
            fetched_at: Utc::now(),
        }
    }

    /// Done only when the execution status is terminal *and* no task is
    /// still pending, running or scheduled.
    pub fn is_terminal(&self) -> bool {
        !is_execution_in_progress(&self.execution, &self.metrics)
    }

    pub fn status(&self) -> Status {
        self.execution.status
    }

    /// Status implied by the task counts alone.
    pub fn rollup_status(&self) -> Option<Status> {
        rollup_status(&self.metrics)
    }

    /// Elapsed time of the execution as of `now`.
    ///
    /// `end - start` once the end time is known, `now - start` before that,
    /// `None` without a start time. Never negative.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        elapsed(self.execution.start_time, self.execution.end_time, now)
    }
}

/// Render a duration the way the console lists do: `2m`, `1m30s`, `45s`,
/// `250ms`, or `-` when there is nothing to show.
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "-".to_string();
    };

    let millis = duration.num_milliseconds();
    if millis <= 0 {
        return "-".to_string();
    }

    let total_seconds = millis / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        if seconds == 0 {
            return format!("{minutes}m");
        }
        return format!("{minutes}m{seconds}s");
    }
    if seconds > 0 {
        return format!("{seconds}s");
    }
    format!("{millis}ms")
}

/// One-line human summary, as printed by the CLI.
pub fn format_summary(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let execution = &snapshot.execution;
    let metrics = &snapshot.metrics;
    let trigger = if execution.trigger.is_empty() {
        "-"
    } else {
        execution.trigger.as_str()
    };

    format!(
        "execution {id}: {status} (trigger: {trigger}) succeeded={ok} failed={failed} \
         in_progress={running} stopped={stopped} total={total} duration={duration}",
        id = execution.id,
        status = execution.status,
        ok = metrics.succeeded,
        failed = metrics.failed,
        running = metrics.in_progress(),
        stopped = metrics.stopped,
        total = metrics.total(),
        duration = format_duration(snapshot.duration_at(now)),
    )
}
