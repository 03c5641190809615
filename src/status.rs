// src/status.rs

//! Status classification.
//!
//! The registry speaks two status vocabularies: the execution/task framework
//! (`Pending`, `Running`, `Scheduled`, `Success`, `Error`, `Stopped`) and the
//! older replication one (`InProgress`, `Succeed`, `Failed`, `Stopped`).
//! Both collapse onto the closed [`Status`] enum here. Anything unrecognised
//! becomes [`Status::Unknown`] so that a new server-side status degrades the
//! display instead of breaking the monitor.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    Pending,
    Running,
    Scheduled,
    Succeeded,
    Failed,
    Stopped,
    #[default]
    Unknown,
}

impl Status {
    /// Canonical label used for display and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Running => "Running",
            Status::Scheduled => "Scheduled",
            Status::Succeeded => "Succeeded",
            Status::Failed => "Failed",
            Status::Stopped => "Stopped",
            Status::Unknown => "Unknown",
        }
    }

    pub fn is_terminal(self) -> bool {
        is_terminal(self)
    }
}

/// Map a raw server status onto [`Status`].
///
/// Matching ignores ASCII case and surrounding whitespace.
pub fn classify(raw: &str) -> Status {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Status::Pending,
        "running" | "inprogress" | "in_progress" => Status::Running,
        "scheduled" => Status::Scheduled,
        "success" | "succeed" | "succeeded" => Status::Succeeded,
        "error" | "failed" | "failure" => Status::Failed,
        "stopped" => Status::Stopped,
        _ => Status::Unknown,
    }
}

/// True only for `Succeeded`, `Failed` and `Stopped`.
///
/// `Unknown` counts as non-terminal: we keep polling rather than give up on
/// a status we do not understand.
pub fn is_terminal(status: Status) -> bool {
    matches!(status, Status::Succeeded | Status::Failed | Status::Stopped)
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(classify(s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(classify).unwrap_or(Status::Unknown))
    }
}
