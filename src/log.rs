// src/log.rs

//! The logging collaborator used by the executor, runner and dispatcher.
//!
//! This is distinct from [`crate::logging`], which only installs the global
//! `tracing` subscriber. A [`Log`] is passed explicitly to every component
//! that writes process output or reacts to service messages.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, error, info, warn};

/// Replacement written in place of a sensitive value.
pub const MASK: &str = "********";

/// Level (or category) of a line written to a [`Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Verbose,
    Info,
    Warn,
    Error,
    Highlight,
    Wait,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Highlight => "highlight",
            LogLevel::Wait => "wait",
        };
        f.write_str(name)
    }
}

/// Sink for leveled text, sensitive-value registration and progress.
pub trait Log: Send + Sync {
    fn write(&self, level: LogLevel, message: &str);

    /// Redact `value` from every line written after this call.
    fn mask_sensitive(&self, value: &str);

    fn progress(&self, percentage: i32, message: Option<&str>);

    fn verbose(&self, message: &str) {
        self.write(LogLevel::Verbose, message);
    }

    fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }
}

/// Registered sensitive values and the masking applied to outgoing text.
#[derive(Debug, Default)]
pub struct SensitiveValues {
    values: RwLock<Vec<String>>,
}

impl SensitiveValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value: &str) {
        if value.is_empty() {
            return;
        }
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.iter().any(|v| v == value) {
            return;
        }
        values.push(value.to_string());
        // Longest first so a value containing another is masked whole.
        values.sort_by_key(|v| std::cmp::Reverse(v.len()));
    }

    pub fn mask(&self, text: &str) -> String {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let mut masked = text.to_string();
        for value in values.iter() {
            if masked.contains(value.as_str()) {
                masked = masked.replace(value.as_str(), MASK);
            }
        }
        masked
    }
}

/// [`Log`] implementation that forwards to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLog {
    sensitive: SensitiveValues,
}

impl TracingLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Log for TracingLog {
    fn write(&self, level: LogLevel, message: &str) {
        let message = self.sensitive.mask(message);
        match level {
            LogLevel::Verbose => debug!(target: "stagehand::output", "{}", message),
            LogLevel::Info => info!(target: "stagehand::output", "{}", message),
            LogLevel::Warn => warn!(target: "stagehand::output", "{}", message),
            LogLevel::Error => error!(target: "stagehand::output", "{}", message),
            LogLevel::Highlight | LogLevel::Wait => {
                info!(target: "stagehand::output", category = %level, "{}", message)
            }
        }
    }

    fn mask_sensitive(&self, value: &str) {
        self.sensitive.add(value);
    }

    fn progress(&self, percentage: i32, message: Option<&str>) {
        let message = message.map(|m| self.sensitive.mask(m)).unwrap_or_default();
        info!(target: "stagehand::progress", percentage, message = %message, "progress");
    }
}
