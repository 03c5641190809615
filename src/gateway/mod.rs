// src/gateway/mod.rs

//! Pluggable access to the remote execution API.
//!
//! The monitor talks to an [`ExecutionGateway`] instead of an HTTP client
//! directly. This makes it easy to swap in scripted fakes in tests while
//! production code uses [`HttpGateway`].
//!
//! - [`HttpGateway`] speaks the registry REST API (replication or preheat
//!   executions, depending on the configured profile).
//! - Tests provide their own implementation that returns canned records and
//!   records how often it was called.

use std::future::Future;
use std::pin::Pin;

use crate::errors::GatewayError;
use crate::model::{Execution, ExecutionId, Task};

pub mod http;

pub use http::HttpGateway;

/// Boxed future returned by gateway operations.
pub type GatewayFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, GatewayError>> + Send + 'a>>;

/// The three remote operations the monitor needs.
///
/// Implementations must be shareable between the monitor and its background
/// poll task, hence `Send + Sync`.
pub trait ExecutionGateway: Send + Sync {
    /// Fetch the execution record.
    fn fetch_execution<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, Execution>;

    /// Fetch every task belonging to the execution.
    fn fetch_tasks<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, Vec<Task>>;

    /// Ask the server to stop the execution.
    fn stop_execution<'a>(&'a self, id: &'a ExecutionId) -> GatewayFuture<'a, ()>;
}
