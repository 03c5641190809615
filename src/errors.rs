// src/errors.rs

//! Crate-wide error types.
//!
//! [`GatewayError`] describes a failure talking to the remote execution API.
//! [`MonitorError`] is what the monitor's public operations return; gateway
//! failures are wrapped according to which operation hit them.

use thiserror::Error;

/// Boxed source error of whatever client library a gateway uses.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by an [`ExecutionGateway`](crate::gateway::ExecutionGateway).
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request never produced a response (connect, timeout, TLS...).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(#[source] BoxError),

    #[error("execution not found: {0}")]
    NotFound(String),

    /// Anything else a gateway implementation wants to surface
    /// (used heavily by the fake gateways in tests).
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum MonitorError {
    /// `fetch_execution` / `fetch_tasks` failed. Never terminates polling.
    #[error("could not refresh execution state: {0}")]
    TransientFetch(#[source] GatewayError),

    /// `stop_execution` failed. Scheduler state is left untouched.
    #[error("could not stop execution: {0}")]
    Cancel(#[source] GatewayError),

    /// `cancel()` on an execution that is not known to be in progress.
    #[error("execution is not in progress; nothing to cancel")]
    NotCancellable,

    /// `cancel()` while an earlier stop request is still in flight.
    #[error("a stop request is already in flight")]
    StopPending,

    #[error("monitor already started")]
    AlreadyStarted,

    #[error("monitor has not been started")]
    NotStarted,

    #[error("poll scheduler is not stopped")]
    NotStopped,

    #[error("monitor has been disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
