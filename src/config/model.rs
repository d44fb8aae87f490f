// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::cmdline::DEFAULT_WRAPPED_RUNTIME;
use crate::exec::ExecutorOptions;

/// Agent configuration as read from `Stagehand.toml`.
///
/// ```toml
/// [process]
/// carry_over_env_prefix = "Tentacle"
/// wrapped_runtime = "dotnet"
/// default_timeout = "30m"
/// reap_grace = "5s"
/// drain_grace = "5s"
///
/// [output]
/// to_log = true
/// as_verbose = false
/// ```
///
/// Every key is optional. Durations take an `ms`, `s`, `m` or `h` suffix.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub process: RawProcessSection,

    #[serde(default)]
    pub output: OutputSection,
}

/// `[process]` before durations are parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProcessSection {
    #[serde(default = "default_carry_over_env_prefix")]
    pub carry_over_env_prefix: String,

    #[serde(default = "default_wrapped_runtime")]
    pub wrapped_runtime: String,

    #[serde(default)]
    pub default_timeout: Option<String>,

    #[serde(default = "default_grace")]
    pub reap_grace: String,

    #[serde(default = "default_grace")]
    pub drain_grace: String,
}

fn default_carry_over_env_prefix() -> String {
    "Tentacle".to_string()
}

fn default_wrapped_runtime() -> String {
    DEFAULT_WRAPPED_RUNTIME.to_string()
}

fn default_grace() -> String {
    "5s".to_string()
}

impl Default for RawProcessSection {
    fn default() -> Self {
        Self {
            carry_over_env_prefix: default_carry_over_env_prefix(),
            wrapped_runtime: default_wrapped_runtime(),
            default_timeout: None,
            reap_grace: default_grace(),
            drain_grace: default_grace(),
        }
    }
}

/// `[output]`: how plain process output is echoed to the log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_true")]
    pub to_log: bool,

    #[serde(default)]
    pub as_verbose: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            to_log: true,
            as_verbose: false,
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub process: ProcessSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSection {
    pub carry_over_env_prefix: String,
    pub wrapped_runtime: String,
    pub default_timeout: Option<Duration>,
    pub reap_grace: Duration,
    pub drain_grace: Duration,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let options = ExecutorOptions::default();
        Self {
            process: ProcessSection {
                carry_over_env_prefix: options.carry_over_prefix,
                wrapped_runtime: default_wrapped_runtime(),
                default_timeout: None,
                reap_grace: options.reap_grace,
                drain_grace: options.drain_grace,
            },
            output: OutputSection::default(),
        }
    }
}

impl ConfigFile {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            carry_over_prefix: self.process.carry_over_env_prefix.clone(),
            reap_grace: self.process.reap_grace,
            drain_grace: self.process.drain_grace,
        }
    }
}
