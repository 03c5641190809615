// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod poll;
pub mod status;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile, GatewayProfile};
use crate::gateway::{ExecutionGateway, HttpGateway};
use crate::model::ExecutionId;
use crate::monitor::{format_summary, ExecutionMonitor, MonitorEvent, StopReason};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the HTTP gateway
/// - one execution monitor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config from {:?}", args.config))?;

    if args.dry_run {
        print_dry_run(&cfg, args.execution.as_deref());
        return Ok(());
    }

    let execution = args
        .execution
        .clone()
        .map(ExecutionId::from)
        .ok_or_else(|| anyhow!("--execution is required"))?;

    let gateway = Arc::new(HttpGateway::new(cfg.gateway.clone())?);
    let (monitor, events) = ExecutionMonitor::new(gateway, cfg.monitor);

    monitor.start(execution).await?;

    if args.once {
        return report_once(&monitor, events);
    }

    if args.cancel {
        if monitor.can_cancel() {
            monitor.cancel().await?;
        } else {
            info!("execution is not in progress; not sending a stop request");
        }
    }

    follow(&monitor, events).await;
    monitor.dispose();
    Ok(())
}

/// `--once`: the first fetch already happened in `start()`.
fn report_once<G: ExecutionGateway + 'static>(
    monitor: &ExecutionMonitor<G>,
    mut events: mpsc::Receiver<MonitorEvent>,
) -> Result<()> {
    let snapshot = monitor.snapshot();
    monitor.dispose();

    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::FetchFailed { error, .. } = event {
            return Err(anyhow!("could not fetch execution: {error}"));
        }
    }

    let snapshot = snapshot.ok_or_else(|| anyhow!("no execution data received"))?;
    println!("{}", format_summary(&snapshot, Utc::now()));
    Ok(())
}

/// Print a summary per update until the execution ends or Ctrl-C.
async fn follow<G: ExecutionGateway + 'static>(
    monitor: &ExecutionMonitor<G>,
    mut events: mpsc::Receiver<MonitorEvent>,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("monitor event channel closed");
                    return;
                };
                match event {
                    MonitorEvent::Updated { .. } => print_current(monitor),
                    MonitorEvent::FetchFailed { seq, error } => {
                        // Keep showing the last good snapshot; polling carries on.
                        warn!(seq, %error, "could not refresh");
                    }
                    MonitorEvent::StaleDiscarded { seq } => {
                        debug!(seq, "stale response ignored");
                    }
                    MonitorEvent::Stopped { reason } => {
                        match reason {
                            StopReason::Terminal => info!("execution finished"),
                            StopReason::Requested | StopReason::Disposed => {
                                info!(?reason, "monitoring stopped")
                            }
                        }
                        return;
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("interrupted; no longer following the execution");
                return;
            }
        }
    }
}

fn print_current<G: ExecutionGateway + 'static>(monitor: &ExecutionMonitor<G>) {
    if let Some(snapshot) = monitor.snapshot() {
        println!("{}", format_summary(&snapshot, Utc::now()));
    }
}

/// Simple dry-run output: resolved settings and the endpoints that would be
/// called.
fn print_dry_run(cfg: &ConfigFile, execution: Option<&str>) {
    println!("execwatch dry-run");
    println!("  monitor.poll_interval = {:?}", cfg.monitor.poll_interval);
    println!("  monitor.event_capacity = {}", cfg.monitor.event_capacity);
    println!("  gateway.base_url = {}", cfg.gateway.base_url);
    match &cfg.gateway.profile {
        GatewayProfile::Replication => println!("  gateway.profile = replication"),
        GatewayProfile::Preheat { project, policy } => {
            println!("  gateway.profile = preheat (project: {project}, policy: {policy})")
        }
    }
    println!("  gateway.timeout = {:?}", cfg.gateway.timeout);
    println!("  gateway.page_size = {}", cfg.gateway.page_size);

    if let Some(id) = execution {
        match HttpGateway::new(cfg.gateway.clone()) {
            Ok(gateway) => {
                let id = ExecutionId::from(id);
                println!();
                println!("endpoints:");
                println!("  execution: {}", gateway.execution_url(&id));
                println!("  tasks:     {}", gateway.tasks_url(&id));
            }
            Err(e) => println!("  (could not build HTTP client: {e})"),
        }
    }

    debug!("dry-run complete (no requests sent)");
}
