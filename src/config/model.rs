// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::monitor::MonitorOptions;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [monitor]
/// poll_interval = "7s"
/// event_capacity = 64
///
/// [gateway]
/// base_url = "https://registry.example.com/api/v2.0"
/// profile = "preheat"
/// project = "library"
/// policy = "nightly"
/// timeout = "10s"
/// ```
///
/// Only `[gateway].base_url` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub monitor: MonitorSection,

    pub gateway: GatewaySection,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    /// Delay between the end of one poll and the start of the next
    /// (`"500ms"`, `"7s"`, `"1m"`...).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Capacity of the notification channel handed to the caller.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_poll_interval() -> String {
    "7s".to_string()
}

fn default_event_capacity() -> usize {
    64
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Which kind of execution the gateway talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Replication,
    Preheat,
}

/// `[gateway]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    /// API root, e.g. `https://registry.example.com/api/v2.0`.
    pub base_url: String,

    #[serde(default)]
    pub profile: ProfileKind,

    /// Project name; required for the `preheat` profile.
    #[serde(default)]
    pub project: Option<String>,

    /// Preheat policy name; required for the `preheat` profile.
    #[serde(default)]
    pub policy: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Page size used when listing tasks.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timeout() -> String {
    "10s".to_string()
}

fn default_page_size() -> usize {
    100
}

/// Endpoint family, resolved from [`GatewaySection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayProfile {
    Replication,
    Preheat { project: String, policy: String },
}

/// Validated gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    pub profile: GatewayProfile,
    pub timeout: Duration,
    pub page_size: usize,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub monitor: MonitorOptions,
    pub gateway: GatewayConfig,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(monitor: MonitorOptions, gateway: GatewayConfig) -> Self {
        Self { monitor, gateway }
    }
}
