// src/exec/runner.rs

//! Runs a [`CommandLineInvocation`] end to end.
//!
//! The runner wires the sinks for one run (service-message scanning with
//! log echo, the caller's extra sink, stdout capture), holds the isolation
//! lock around isolated runs, delegates to a [`ProcessBackend`] and packages
//! a [`CommandResult`]. Execution failures become a result with exit code
//! -1; only malformed invocations are returned as errors.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use super::backend::{ProcessBackend, ProcessRequest};
use super::credentials::Credentials;
use super::isolation::Isolation;
use super::result::CommandResult;
use super::sink::{FanOutSink, OutputSink, ServiceMessageSink};
use super::InvocationError;
use crate::cmdline::CommandLineInvocation;
use crate::log::Log;
use crate::messages::{Echo, Session};

pub struct InvocationRunner<B> {
    backend: B,
    log: Arc<dyn Log>,
    isolation: Isolation,
    default_timeout: Option<Duration>,
}

impl<B: ProcessBackend> InvocationRunner<B> {
    /// Isolated runs share the process-wide lock.
    pub fn new(backend: B, log: Arc<dyn Log>) -> Self {
        Self {
            backend,
            log,
            isolation: Isolation::global(),
            default_timeout: None,
        }
    }

    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Used when an invocation sets no timeout of its own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn run(
        &self,
        invocation: CommandLineInvocation,
    ) -> Result<CommandResult, InvocationError> {
        self.run_with_session(invocation)
            .await
            .map(|(result, _)| result)
    }

    /// Like [`run`](Self::run), also returning what the process reported
    /// through service messages.
    #[instrument(skip_all, fields(command = %invocation))]
    pub async fn run_with_session(
        &self,
        mut invocation: CommandLineInvocation,
    ) -> Result<(CommandResult, Session), InvocationError> {
        if invocation.executable.trim().is_empty() {
            return Err(InvocationError::MissingExecutable);
        }
        let has_user = invocation
            .user_name
            .as_deref()
            .is_some_and(|user| !user.trim().is_empty());
        if invocation.password.is_some() && !has_user {
            return Err(InvocationError::PasswordWithoutUser);
        }

        let command = invocation.to_string();
        let working_directory = invocation
            .working_directory
            .take()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let credentials = match (invocation.user_name.take(), invocation.password.take()) {
            (Some(user), Some(password)) => Some(Credentials::new(&user, password)),
            _ => None,
        };

        let request = ProcessRequest {
            executable: invocation.executable.clone(),
            arguments: invocation.arguments.clone(),
            working_directory: working_directory.clone(),
            environment: invocation.environment_vars.take().unwrap_or_default(),
            credentials,
            timeout: invocation.timeout.or(self.default_timeout),
        };

        let echo = Echo::from_flags(invocation.output_to_log, invocation.output_as_verbose);
        let mut messages = ServiceMessageSink::new(self.log.clone(), echo);
        let mut extra = invocation.additional_sink.take();
        let mut stdout = StdoutCapture::default();

        let guard = if invocation.isolate {
            debug!("waiting for the isolation lock");
            Some(self.isolation.acquire().await)
        } else {
            None
        };

        let outcome = {
            let mut sinks = FanOutSink::new();
            sinks.push(&mut messages);
            if let Some(extra) = extra.as_deref_mut() {
                sinks.push(extra);
            }
            sinks.push(&mut stdout);
            self.backend.execute(request, &mut sinks).await
        };

        let result = match outcome {
            Ok(outcome) => {
                info!(
                    exit_code = outcome.exit_code,
                    timed_out = outcome.timed_out,
                    "invocation finished"
                );
                CommandResult {
                    command,
                    exit_code: outcome.exit_code,
                    errors: (!outcome.errors.is_empty()).then_some(outcome.errors),
                    output: Some(stdout.text),
                    working_directory,
                    timed_out: outcome.timed_out,
                }
            }
            Err(e) => {
                error!(error = %e, "invocation failed");
                self.log.error(&e.to_string());
                CommandResult {
                    command,
                    exit_code: -1,
                    errors: Some(e.to_string()),
                    output: Some(stdout.text),
                    working_directory,
                    timed_out: false,
                }
            }
        };
        drop(guard);

        Ok((result, messages.into_session()))
    }
}

#[derive(Default)]
struct StdoutCapture {
    text: String,
}

impl OutputSink for StdoutCapture {
    fn write_info(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn write_error(&mut self, _line: &str) {}
}
