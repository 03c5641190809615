// tests/http_gateway.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use execwatch::errors::GatewayError;
use execwatch::gateway::{ExecutionGateway, HttpGateway};
use execwatch::model::ExecutionId;
use execwatch::monitor::{ExecutionMonitor, MonitorEvent, MonitorOptions, StopReason};
use execwatch::status::Status;

type TestResult = Result<(), Box<dyn Error>>;

const REPLICATION: &str = "/replication/executions/17";
const PREHEAT: &str = "/projects/library/preheat/policies/nightly/executions/9";

fn replication_gateway(server: &MockServer) -> Result<HttpGateway, Box<dyn Error>> {
    let cfg = ConfigFileBuilder::new(&server.uri()).build();
    Ok(HttpGateway::new(cfg.gateway)?)
}

fn preheat_gateway(server: &MockServer) -> Result<HttpGateway, Box<dyn Error>> {
    let cfg = ConfigFileBuilder::new(&server.uri())
        .preheat("library", "nightly")
        .build();
    Ok(HttpGateway::new(cfg.gateway)?)
}

#[tokio::test]
async fn fetches_replication_execution() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17,
            "status": "InProgress",
            "trigger": "MANUAL",
            "start_time": "2025-03-01T12:00:00Z",
            "end_time": "0001-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = replication_gateway(&server)?;
    let exec = gateway.fetch_execution(&ExecutionId::from(17_i64)).await?;

    assert_eq!(exec.id.as_str(), "17");
    assert_eq!(exec.status, Status::Running);
    assert!(exec.start_time.is_some());
    assert_eq!(exec.end_time, None);
    Ok(())
}

#[tokio::test]
async fn tasks_are_paged_and_get_log_links() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    let tasks_path = format!("{REPLICATION}/tasks");

    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "Succeed"},
            {"id": 2, "status": "Failed"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "status": "InProgress", "log_ref": "s3://logs/3"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = ConfigFileBuilder::new(&server.uri()).page_size(2).build();
    let gateway = HttpGateway::new(cfg.gateway)?;
    let tasks = gateway.fetch_tasks(&ExecutionId::from("17")).await?;

    let statuses: Vec<Status> = tasks.iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![Status::Succeeded, Status::Failed, Status::Running]);

    assert_eq!(
        tasks[0].log_ref.as_deref(),
        Some(format!("{}{REPLICATION}/tasks/1/log", server.uri()).as_str())
    );
    assert_eq!(tasks[2].log_ref.as_deref(), Some("s3://logs/3"));
    Ok(())
}

#[tokio::test]
async fn full_last_page_triggers_one_more_request() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    let tasks_path = format!("{PREHEAT}/tasks");

    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "Success"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = ConfigFileBuilder::new(&server.uri())
        .preheat("library", "nightly")
        .page_size(1)
        .build();
    let gateway = HttpGateway::new(cfg.gateway)?;
    let tasks = gateway.fetch_tasks(&ExecutionId::from("9")).await?;

    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].log_ref.as_deref(),
        Some(format!("{}{PREHEAT}/tasks/1/logs", server.uri()).as_str())
    );
    Ok(())
}

#[tokio::test]
async fn total_count_header_ends_paging() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    // Ignores `page` entirely but reports the real total.
    Mock::given(method("GET"))
        .and(path(format!("{REPLICATION}/tasks")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-count", "2")
                .set_body_json(json!([
                    {"id": 1, "status": "Succeed"},
                    {"id": 2, "status": "Succeed"}
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cfg = ConfigFileBuilder::new(&server.uri()).page_size(2).build();
    let gateway = HttpGateway::new(cfg.gateway)?;
    let tasks = with_timeout(gateway.fetch_tasks(&ExecutionId::from("17"))).await?;

    assert_eq!(tasks.len(), 2);
    Ok(())
}

#[tokio::test]
async fn repeated_page_ends_paging() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    // Ignores `page` and sends no total: every page is the first one.
    Mock::given(method("GET"))
        .and(path(format!("{REPLICATION}/tasks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "Succeed"},
            {"id": 2, "status": "Running"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let cfg = ConfigFileBuilder::new(&server.uri()).page_size(2).build();
    let gateway = HttpGateway::new(cfg.gateway)?;
    let tasks = with_timeout(gateway.fetch_tasks(&ExecutionId::from("17"))).await?;

    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    Ok(())
}

#[tokio::test]
async fn replication_stop_is_a_put() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = replication_gateway(&server)?;
    gateway.stop_execution(&ExecutionId::from("17")).await?;
    Ok(())
}

#[tokio::test]
async fn preheat_stop_patches_status() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(PREHEAT))
        .and(body_json(json!({"status": "Stopped"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = preheat_gateway(&server)?;
    gateway.stop_execution(&ExecutionId::from("9")).await?;
    Ok(())
}

#[tokio::test]
async fn missing_execution_is_not_found() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    let gateway = replication_gateway(&server)?;

    let err = gateway
        .fetch_execution(&ExecutionId::from("17"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(url) if url.ends_with(REPLICATION)));
    Ok(())
}

#[tokio::test]
async fn server_error_carries_status_and_body() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = replication_gateway(&server)?;
    let err = gateway
        .stop_execution(&ExecutionId::from("17"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn garbage_body_is_a_decode_error() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let gateway = replication_gateway(&server)?;
    let err = gateway
        .fetch_execution(&ExecutionId::from("17"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
    Ok(())
}

#[tokio::test]
async fn monitor_follows_execution_over_http() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    let tasks_path = format!("{REPLICATION}/tasks");

    // First poll sees the job running; later polls see it finished.
    Mock::given(method("GET"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17, "status": "InProgress", "start_time": "2025-03-01T12:00:00Z"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "InProgress"},
            {"id": 2, "status": "Succeed"}
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17,
            "status": "Succeed",
            "start_time": "2025-03-01T12:00:00Z",
            "end_time": "2025-03-01T12:01:00Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(tasks_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "Succeed"},
            {"id": 2, "status": "Succeed"}
        ])))
        .mount(&server)
        .await;

    let gateway = Arc::new(replication_gateway(&server)?);
    let options = MonitorOptions {
        poll_interval: Duration::from_millis(50),
        ..MonitorOptions::default()
    };
    let (monitor, mut events) = ExecutionMonitor::new(gateway, options);

    monitor.start(17_i64).await?;
    assert_eq!(monitor.in_progress_count(), 1);

    let stopped = with_timeout(async {
        while let Some(event) = events.recv().await {
            if let MonitorEvent::Stopped { reason } = event {
                return Some(reason);
            }
        }
        None
    })
    .await;

    assert_eq!(stopped, Some(StopReason::Terminal));
    assert_eq!(monitor.success_count(), 2);
    assert_eq!(monitor.duration().map(|d| d.num_seconds()), Some(60));
    Ok(())
}

#[tokio::test]
async fn cancel_flag_on_finished_execution_exits_cleanly() -> TestResult {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 17,
            "status": "Succeed",
            "start_time": "2025-03-01T12:00:00Z",
            "end_time": "2025-03-01T12:00:30Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPLICATION}/tasks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "Succeed"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(REPLICATION))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = dir.path().join("Execwatch.toml");
    std::fs::write(
        &config,
        format!("[gateway]\nbase_url = \"{}\"\n", server.uri()),
    )?;

    let args = execwatch::cli::CliArgs::try_parse_from([
        "execwatch",
        "--config",
        config.to_str().ok_or("non-utf8 temp path")?,
        "--execution",
        "17",
        "--cancel",
    ])?;
    with_timeout(execwatch::run(args)).await?;
    Ok(())
}
