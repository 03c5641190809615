pub mod builders;
pub mod fake_gateway;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use execwatch::monitor::MonitorEvent;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout (real time).
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Wait for the next monitor notification.
///
/// Meant for `start_paused` tests: the timeout is far beyond any poll
/// interval used in the suite, so auto-advancing time reaches the poll
/// timer first.
pub async fn next_event(events: &mut mpsc::Receiver<MonitorEvent>) -> MonitorEvent {
    tokio::time::timeout(Duration::from_secs(600), events.recv())
        .await
        .expect("no monitor event within 10 minutes of virtual time")
        .expect("monitor event channel closed")
}
