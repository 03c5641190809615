// tests/monitor_ordering.rs

mod common;
use crate::common::builders::{execution, tasks};
use crate::common::fake_gateway::GatedGateway;
use crate::common::{init_tracing, next_event};

use std::error::Error;
use std::sync::Arc;

use tokio::time::Duration;

use execwatch::monitor::{ApplyOutcome, ExecutionMonitor, MonitorEvent, MonitorOptions};
use execwatch::model::{Execution, Task};
use execwatch::status::Status;

type TestResult = Result<(), Box<dyn Error>>;

fn options() -> MonitorOptions {
    MonitorOptions {
        poll_interval: Duration::from_secs(7),
        ..MonitorOptions::default()
    }
}

fn running() -> (Execution, Vec<Task>) {
    (
        execution("e1", Status::Running),
        tasks(&[Status::Running, Status::Pending]),
    )
}

fn succeeded() -> (Execution, Vec<Task>) {
    (
        execution("e1", Status::Succeeded),
        tasks(&[Status::Succeeded, Status::Succeeded]),
    )
}

#[tokio::test(start_paused = true)]
async fn older_response_arriving_late_is_discarded() -> TestResult {
    init_tracing();

    // Poll 0: start(). Poll 1: slow refresh. Poll 2: fast refresh.
    let gateway = Arc::new(GatedGateway::new(vec![running(), running(), succeeded()]));
    let slow = gateway.hold(1);
    let (monitor, mut events) = ExecutionMonitor::new(Arc::clone(&gateway), options());

    monitor.start("e1").await?;
    assert_eq!(next_event(&mut events).await, MonitorEvent::Updated { seq: 1, terminal: false });

    let (first, second) = tokio::join!(monitor.refresh(), async {
        let outcome = monitor.refresh().await;
        slow.notify_one();
        outcome
    });

    assert_eq!(second?, ApplyOutcome::Applied);
    assert_eq!(first?, ApplyOutcome::StaleDiscarded);

    let snapshot = monitor.snapshot().expect("snapshot present");
    assert_eq!(snapshot.seq, 3);
    assert_eq!(snapshot.status(), Status::Succeeded);
    assert_eq!(monitor.success_count(), 2);
    assert!(monitor.is_terminal());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&MonitorEvent::Updated { seq: 3, terminal: true }));
    assert!(seen.contains(&MonitorEvent::StaleDiscarded { seq: 2 }));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn response_arriving_after_dispose_is_dropped() -> TestResult {
    init_tracing();

    let gateway = Arc::new(GatedGateway::new(vec![running(), succeeded()]));
    let slow = gateway.hold(1);
    let (monitor, mut events) = ExecutionMonitor::new(Arc::clone(&gateway), options());

    monitor.start("e1").await?;
    next_event(&mut events).await;

    let (outcome, ()) = tokio::join!(monitor.refresh(), async {
        monitor.dispose();
        slow.notify_one();
    });

    assert_eq!(outcome?, ApplyOutcome::Dropped);
    assert!(monitor.is_disposed());
    assert!(monitor.snapshot().is_none());
    assert_eq!(monitor.success_count(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn response_arriving_after_stop_is_still_applied() -> TestResult {
    init_tracing();

    let gateway = Arc::new(GatedGateway::new(vec![running(), succeeded()]));
    let slow = gateway.hold(1);
    let (monitor, mut events) = ExecutionMonitor::new(Arc::clone(&gateway), options());

    monitor.start("e1").await?;
    next_event(&mut events).await;

    let (outcome, ()) = tokio::join!(monitor.refresh(), async {
        monitor.stop();
        slow.notify_one();
    });

    assert_eq!(outcome?, ApplyOutcome::Applied);
    assert!(monitor.is_terminal());
    assert_eq!(monitor.success_count(), 2);
    Ok(())
}
