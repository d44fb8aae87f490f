// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, ProcessSection, RawConfigFile, RawProcessSection};
use crate::errors::{Result, StagehandError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = StagehandError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let process = validate_process(raw.process)?;
        Ok(ConfigFile {
            process,
            output: raw.output,
        })
    }
}

fn validate_process(raw: RawProcessSection) -> Result<ProcessSection> {
    if raw.carry_over_env_prefix.trim().is_empty() {
        return Err(StagehandError::ConfigError(
            "[process].carry_over_env_prefix must not be empty".to_string(),
        ));
    }
    if raw.wrapped_runtime.trim().is_empty() {
        return Err(StagehandError::ConfigError(
            "[process].wrapped_runtime must not be empty".to_string(),
        ));
    }

    let default_timeout = raw
        .default_timeout
        .as_deref()
        .map(|s| field_duration("default_timeout", s))
        .transpose()?;
    if default_timeout == Some(Duration::ZERO) {
        return Err(StagehandError::ConfigError(
            "[process].default_timeout must be greater than zero".to_string(),
        ));
    }

    let reap_grace = non_zero_duration("reap_grace", &raw.reap_grace)?;
    let drain_grace = non_zero_duration("drain_grace", &raw.drain_grace)?;

    Ok(ProcessSection {
        carry_over_env_prefix: raw.carry_over_env_prefix,
        wrapped_runtime: raw.wrapped_runtime,
        default_timeout,
        reap_grace,
        drain_grace,
    })
}

fn field_duration(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| {
        StagehandError::ConfigError(format!("[process].{field} = {value:?} is invalid: {e}"))
    })
}

fn non_zero_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = field_duration(field, value)?;
    if duration.is_zero() {
        return Err(StagehandError::ConfigError(format!(
            "[process].{field} must be greater than zero"
        )));
    }
    Ok(duration)
}

/// Parse `250ms`, `3s`, `1m` or `2h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(60 * 60))),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
