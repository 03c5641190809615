// src/model.rs

//! Execution and task records as the monitor sees them.
//!
//! Only the fields the monitor needs are modelled; everything else in the
//! server payload is ignored by `serde`.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer};

use crate::metrics::Metrics;
use crate::status::Status;

/// Opaque execution identifier.
///
/// The server may send integers or strings; both end up as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ExecutionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for ExecutionId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ExecutionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self(deserialize_opaque_id(deserializer)?))
    }
}

/// One run of a server-side batch job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub trigger: String,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub end_time: Option<DateTime<Utc>>,

    /// Whatever the server embedded is replaced by the aggregated task
    /// counts before the record is stored in a snapshot.
    #[serde(default)]
    pub metrics: Metrics,
}

/// One unit of work belonging to an [`Execution`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "deserialize_opaque_id")]
    pub id: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub end_time: Option<DateTime<Utc>>,

    /// Where the task output can be fetched from. Never interpreted here.
    #[serde(default)]
    pub log_ref: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
            start_time: None,
            end_time: None,
            log_ref: None,
        }
    }

    /// Elapsed time of this task as of `now`; same rules as
    /// [`Snapshot::duration_at`](crate::monitor::Snapshot::duration_at).
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        elapsed(self.start_time, self.end_time, now)
    }
}

/// `end - start`, or `now - start` while still open. Never negative; `None`
/// without a start time.
pub(crate) fn elapsed(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let start = start?;
    let end = end.unwrap_or(now);
    Some((end - start).max(Duration::zero()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// Timestamps arrive as RFC 3339 strings. The server reports "not set" as
/// `null`, an empty string, or the zero time `0001-01-01T00:00:00Z`; all of
/// those become `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(serde::de::Error::custom)?
        .with_timezone(&Utc);

    if parsed.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(parsed))
}
