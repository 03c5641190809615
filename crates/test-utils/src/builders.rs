#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use execwatch::config::{ConfigFile, GatewaySection, MonitorSection, ProfileKind, RawConfigFile};
use execwatch::metrics::Metrics;
use execwatch::model::{Execution, ExecutionId, Task};
use execwatch::status::Status;

/// Fixed start time used by every built execution.
pub fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

/// An execution with a start time; terminal ones also get an end time
/// 90 seconds later.
pub fn execution(id: &str, status: Status) -> Execution {
    let start = started_at();
    Execution {
        id: ExecutionId::from(id),
        status,
        trigger: "MANUAL".to_string(),
        start_time: Some(start),
        end_time: status.is_terminal().then(|| start + Duration::seconds(90)),
        metrics: Metrics::default(),
    }
}

/// One task per status, with ids `"1"`, `"2"`, ...
pub fn tasks(statuses: &[Status]) -> Vec<Task> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| Task::new((i + 1).to_string(), *status))
        .collect()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            config: RawConfigFile {
                monitor: MonitorSection::default(),
                gateway: GatewaySection {
                    base_url: base_url.to_string(),
                    profile: ProfileKind::Replication,
                    project: None,
                    policy: None,
                    timeout: "5s".to_string(),
                    page_size: 100,
                },
            },
        }
    }

    pub fn preheat(mut self, project: &str, policy: &str) -> Self {
        self.config.gateway.profile = ProfileKind::Preheat;
        self.config.gateway.project = Some(project.to_string());
        self.config.gateway.policy = Some(policy.to_string());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.gateway.page_size = page_size;
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.monitor.poll_interval = interval.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
