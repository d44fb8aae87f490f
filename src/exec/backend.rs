// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The runner talks to a `ProcessBackend` instead of spawning processes
//! itself. [`super::ProcessExecutor`] is the real implementation; tests swap
//! in a scripted one that replays canned output without touching the OS.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use super::ExecError;
use super::credentials::Credentials;
use super::sink::OutputSink;

/// Everything needed to start one process.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub executable: String,
    /// Escaped argument string.
    pub arguments: String,
    pub working_directory: PathBuf,
    /// Overrides applied on top of the inherited (or fresh) environment.
    pub environment: HashMap<String, String>,
    pub credentials: Option<Credentials>,
    pub timeout: Option<Duration>,
}

impl ProcessRequest {
    pub fn new(executable: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: arguments.into(),
            working_directory: PathBuf::from("."),
            environment: HashMap::new(),
            credentials: None,
            timeout: None,
        }
    }
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    /// Every stderr line, each followed by `\n`.
    pub errors: String,
    pub timed_out: bool,
    pub pid: Option<u32>,
}

impl ProcessOutcome {
    /// The synthetic result of a process that never started.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        let mut errors = message.into();
        errors.push('\n');
        Self {
            exit_code: -1,
            errors,
            timed_out: false,
            pid: None,
        }
    }
}

/// Runs one process, streaming its output lines to `sink`.
///
/// Spawn failures are reported as an outcome with exit code -1, not as an
/// `Err`; `Err` is reserved for failures of the host machinery itself.
pub trait ProcessBackend: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        sink: &'a mut (dyn OutputSink + Send),
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutcome, ExecError>> + Send + 'a>>;
}
