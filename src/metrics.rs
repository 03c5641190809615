// src/metrics.rs

//! Task-count aggregation.
//!
//! Counts are always recomputed from the task list; the numbers the server
//! embeds in an execution record are not trusted.

use serde::Deserialize;

use crate::model::{Execution, Task};
use crate::status::{is_terminal, Status};

/// Per-status task counts for one execution.
///
/// The `serde` names match the metrics object the server embeds in execution
/// records. Missing fields default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Metrics {
    #[serde(rename = "pending_task_count")]
    pub pending: usize,
    #[serde(rename = "running_task_count")]
    pub running: usize,
    #[serde(rename = "scheduled_task_count")]
    pub scheduled: usize,
    #[serde(rename = "success_task_count")]
    pub succeeded: usize,
    #[serde(rename = "error_task_count")]
    pub failed: usize,
    #[serde(rename = "stopped_task_count")]
    pub stopped: usize,
    /// Tasks whose status could not be classified.
    #[serde(skip)]
    pub unknown: usize,
}

impl Metrics {
    /// Sum of every bucket; equals the number of aggregated tasks.
    pub fn total(&self) -> usize {
        self.pending
            + self.running
            + self.scheduled
            + self.succeeded
            + self.failed
            + self.stopped
            + self.unknown
    }

    pub fn in_progress(&self) -> usize {
        in_progress_count(self)
    }

    fn bump(&mut self, status: Status) {
        let bucket = match status {
            Status::Pending => &mut self.pending,
            Status::Running => &mut self.running,
            Status::Scheduled => &mut self.scheduled,
            Status::Succeeded => &mut self.succeeded,
            Status::Failed => &mut self.failed,
            Status::Stopped => &mut self.stopped,
            Status::Unknown => &mut self.unknown,
        };
        *bucket += 1;
    }
}

/// Count tasks per status in a single pass.
pub fn aggregate(tasks: &[Task]) -> Metrics {
    tasks.iter().fold(Metrics::default(), |mut metrics, task| {
        metrics.bump(task.status);
        metrics
    })
}

/// `pending + running + scheduled`.
pub fn in_progress_count(metrics: &Metrics) -> usize {
    metrics.pending + metrics.running + metrics.scheduled
}

/// Whether the job still needs watching.
///
/// The execution-level status and the task roll-up can disagree for a poll
/// interval or so; the job only counts as done once *both* say so.
pub fn is_execution_in_progress(execution: &Execution, metrics: &Metrics) -> bool {
    !is_terminal(execution.status) || in_progress_count(metrics) > 0
}

/// Derive an execution status from its task counts, using the same order of
/// precedence as the server: anything in progress, then failures, then
/// stops, then successes.
///
/// Returns `None` when there are no classified tasks to go on.
pub fn rollup_status(metrics: &Metrics) -> Option<Status> {
    if in_progress_count(metrics) > 0 {
        Some(Status::Running)
    } else if metrics.failed > 0 {
        Some(Status::Failed)
    } else if metrics.stopped > 0 {
        Some(Status::Stopped)
    } else if metrics.succeeded > 0 {
        Some(Status::Succeeded)
    } else {
        None
    }
}
