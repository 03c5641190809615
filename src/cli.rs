// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `execwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execwatch",
    version,
    about = "Follow a registry replication or preheat execution until it finishes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Execwatch.toml")]
    pub config: String,

    /// Id of the execution to follow.
    #[arg(long, value_name = "ID", required_unless_present = "dry_run")]
    pub execution: Option<String>,

    /// Fetch once, print the summary and exit.
    #[arg(long)]
    pub once: bool,

    /// Ask the server to stop the execution, then follow it until it ends.
    #[arg(long, conflicts_with = "once")]
    pub cancel: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print endpoints, but don't contact the server.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
