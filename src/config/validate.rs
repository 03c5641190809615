// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, GatewayConfig, GatewayProfile, GatewaySection, MonitorSection, ProfileKind,
    RawConfigFile,
};
use crate::errors::{MonitorError, Result};
use crate::monitor::MonitorOptions;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MonitorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let monitor = validate_monitor(&raw.monitor)?;
        let gateway = validate_gateway(raw.gateway)?;
        Ok(ConfigFile::new_unchecked(monitor, gateway))
    }
}

fn validate_monitor(section: &MonitorSection) -> Result<MonitorOptions> {
    let poll_interval = parse_duration(&section.poll_interval)
        .map_err(|e| config_error(format!("[monitor].poll_interval: {e}")))?;
    if poll_interval.is_zero() {
        return Err(config_error("[monitor].poll_interval must be > 0"));
    }

    if section.event_capacity == 0 {
        return Err(config_error("[monitor].event_capacity must be >= 1 (got 0)"));
    }

    Ok(MonitorOptions {
        poll_interval,
        event_capacity: section.event_capacity,
    })
}

fn validate_gateway(section: GatewaySection) -> Result<GatewayConfig> {
    let base_url = section.base_url.trim().trim_end_matches('/').to_string();
    if base_url.is_empty() {
        return Err(config_error("[gateway].base_url must not be empty"));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(config_error(format!(
            "[gateway].base_url must start with http:// or https:// (got '{base_url}')"
        )));
    }

    let timeout = parse_duration(&section.timeout)
        .map_err(|e| config_error(format!("[gateway].timeout: {e}")))?;
    if timeout.is_zero() {
        return Err(config_error("[gateway].timeout must be > 0"));
    }

    if section.page_size == 0 {
        return Err(config_error("[gateway].page_size must be >= 1 (got 0)"));
    }

    let profile = match section.profile {
        ProfileKind::Replication => GatewayProfile::Replication,
        ProfileKind::Preheat => {
            let project = required(section.project, "project")?;
            let policy = required(section.policy, "policy")?;
            GatewayProfile::Preheat { project, policy }
        }
    };

    Ok(GatewayConfig {
        base_url,
        profile,
        timeout,
        page_size: section.page_size,
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(config_error(format!(
            "[gateway].{field} is required for the preheat profile"
        ))),
    }
}

fn config_error(msg: impl Into<String>) -> MonitorError {
    MonitorError::ConfigError(msg.into())
}

/// Parse a duration such as `"500ms"`, `"7s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{s}'"))
}
