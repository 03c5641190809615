// tests/cli_dry_run.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;

use clap::Parser;

use execwatch::cli::CliArgs;
use execwatch::logging::parse_level_str;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn execution_is_required_unless_dry_run() {
    assert!(CliArgs::try_parse_from(["execwatch"]).is_err());
    assert!(CliArgs::try_parse_from(["execwatch", "--dry-run"]).is_ok());

    let args = CliArgs::try_parse_from(["execwatch", "--execution", "42", "--once"]).unwrap();
    assert_eq!(args.execution.as_deref(), Some("42"));
    assert!(args.once);
    assert_eq!(args.config, "Execwatch.toml");
}

#[test]
fn once_and_cancel_conflict() {
    let result = CliArgs::try_parse_from(["execwatch", "--execution", "1", "--once", "--cancel"]);
    assert!(result.is_err());
}

#[test]
fn log_levels_parse_from_env_strings() {
    assert_eq!(parse_level_str("DEBUG"), Some(tracing::Level::DEBUG));
    assert_eq!(parse_level_str(" warning "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("loud"), None);
}

#[tokio::test]
async fn dry_run_validates_config_without_network() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Execwatch.toml");
    // Nothing listens on port 9; a dry run must not try.
    fs::write(
        &path,
        r#"
        [gateway]
        base_url = "http://127.0.0.1:9/api/v2.0"
        profile = "preheat"
        project = "library"
        policy = "nightly"
        "#,
    )?;

    let args = CliArgs::try_parse_from([
        "execwatch",
        "--config",
        path.to_str().ok_or("non-utf8 temp path")?,
        "--execution",
        "5",
        "--dry-run",
    ])?;
    execwatch::run(args).await?;
    Ok(())
}

#[tokio::test]
async fn dry_run_reports_invalid_config() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Execwatch.toml");
    fs::write(&path, "[gateway]\nbase_url = \"ftp://nope\"\n")?;

    let args = CliArgs::try_parse_from([
        "execwatch",
        "--config",
        path.to_str().ok_or("non-utf8 temp path")?,
        "--dry-run",
    ])?;
    assert!(execwatch::run(args).await.is_err());
    Ok(())
}
