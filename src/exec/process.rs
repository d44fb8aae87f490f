// src/exec/process.rs

//! The real [`ProcessBackend`]: spawns an OS process with `tokio::process`.
//!
//! stdout and stderr are read by two reader tasks that push decoded lines
//! into bounded channels. A single loop drains both channels into the sink
//! while waiting for the child to exit, so lines reach the sink in arrival
//! order within each stream. A timeout cancels the wait, kills the child,
//! waits a bounded time for the OS to reap it, and then gives the readers a
//! bounded time to deliver what was already buffered.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ExecError;
use super::backend::{ProcessBackend, ProcessOutcome, ProcessRequest};
use super::credentials::{
    Authenticator, Credentials, NoopSessionAccess, RejectPasswords, SessionAccess,
};
use super::encoding::OutputEncoding;
use super::sink::OutputSink;
use crate::log::Log;

const LINE_CHANNEL_CAPACITY: usize = 256;

/// Tunables for [`ProcessExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Variables whose names start with this are copied into children that
    /// run under another account.
    pub carry_over_prefix: String,
    /// How long to wait for the OS to reap a killed child.
    pub reap_grace: Duration,
    /// How long readers may keep delivering output after a kill.
    pub drain_grace: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            carry_over_prefix: "Tentacle".to_string(),
            reap_grace: Duration::from_secs(5),
            drain_grace: Duration::from_secs(5),
        }
    }
}

pub struct ProcessExecutor {
    log: Arc<dyn Log>,
    authenticator: Arc<dyn Authenticator>,
    session_access: Arc<dyn SessionAccess>,
    options: ExecutorOptions,
    encoding: OutputEncoding,
}

impl ProcessExecutor {
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self {
            log,
            authenticator: Arc::new(RejectPasswords),
            session_access: Arc::new(NoopSessionAccess),
            options: ExecutorOptions::default(),
            encoding: OutputEncoding::detect(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Password check run before starting a child under other credentials.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_session_access(mut self, access: Arc<dyn SessionAccess>) -> Self {
        self.session_access = access;
        self
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Run one process to completion, streaming its lines to `sink`.
    ///
    /// A process that cannot be started yields exit code -1 with the reason
    /// written to the sink's error channel and to `errors`.
    #[instrument(
        skip_all,
        fields(executable = %request.executable, cwd = %request.working_directory.display())
    )]
    pub async fn run(
        &self,
        request: ProcessRequest,
        sink: &mut (dyn OutputSink + Send),
    ) -> Result<ProcessOutcome, ExecError> {
        let spawned = self
            .build_command(&request)
            .and_then(|mut command| command.spawn().map_err(SpawnError::Io));

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let message = e.describe(&request.executable);
                warn!(error = %message, "process could not be started");
                sink.write_error(&message);
                return Ok(ProcessOutcome::spawn_failure(message));
            }
        };

        let pid = child.id();
        info!(pid, arguments = %request.arguments, "process started");

        let (stdout_tx, stdout_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let readers: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .map(|out| spawn_reader(out, self.encoding, stdout_tx)),
            child
                .stderr
                .take()
                .map(|err| spawn_reader(err, self.encoding, stderr_tx)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut streams = LineStreams::new(stdout_rx, stderr_rx);

        let deadline = CancellationToken::new();
        let timer = request.timeout.map(|timeout| {
            let token = deadline.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        });

        let mut status: Option<ExitStatus> = None;
        let mut timed_out = false;

        loop {
            tokio::select! {
                res = child.wait(), if status.is_none() && !timed_out => {
                    let exited = res.map_err(|source| ExecError::Wait {
                        executable: request.executable.clone(),
                        source,
                    })?;
                    status = Some(exited);
                }
                _ = deadline.cancelled(), if status.is_none() && !timed_out => {
                    timed_out = true;
                    status = self.kill(&mut child, pid, request.timeout).await;
                    break;
                }
                _ = streams.pump(sink), if streams.is_open() => {}
                else => break,
            }
        }

        if timed_out {
            let drained = tokio::time::timeout(self.options.drain_grace, streams.drain(sink)).await;
            if drained.is_err() {
                warn!(pid, "output readers did not finish after the process was killed");
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }
        for reader in readers {
            reader.abort();
        }

        let exit_code = exit_code(status);
        info!(pid, exit_code, timed_out, "process finished");

        Ok(ProcessOutcome {
            exit_code,
            errors: streams.into_errors(),
            timed_out,
            pid,
        })
    }

    async fn kill(
        &self,
        child: &mut Child,
        pid: Option<u32>,
        timeout: Option<Duration>,
    ) -> Option<ExitStatus> {
        let pid = pid.map_or_else(|| "?".to_string(), |p| p.to_string());
        let timeout = timeout.unwrap_or_default();
        self.log.error(&format!(
            "Process with ID {pid} exceeded the max allowed runtime of {timeout:?} and will be killed."
        ));

        if let Err(e) = child.start_kill() {
            warn!(pid = %pid, error = %e, "failed to kill timed out process");
        }

        match tokio::time::timeout(self.options.reap_grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!(pid = %pid, error = %e, "failed to reap killed process");
                None
            }
            Err(_) => {
                warn!(pid = %pid, "killed process was not reaped in time");
                None
            }
        }
    }

    fn build_command(&self, request: &ProcessRequest) -> Result<Command, SpawnError> {
        let mut command = Command::new(&request.executable);
        add_arguments(&mut command, &request.arguments);
        command
            .current_dir(&request.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(credentials) = &request.credentials {
            self.authenticator
                .authenticate(&credentials.account, &credentials.password)
                .map_err(SpawnError::Exec)?;
            self.session_access
                .grant(&credentials.account)
                .map_err(SpawnError::Exec)?;
            self.impersonate(&mut command, credentials)
                .map_err(SpawnError::Exec)?;
        }

        command.envs(&request.environment);
        Ok(command)
    }

    #[cfg(unix)]
    fn impersonate(&self, command: &mut Command, credentials: &Credentials) -> Result<(), ExecError> {
        use super::credentials::{carry_over_vars, resolve_identity};

        let identity = resolve_identity(&credentials.account)?;
        let carried = carry_over_vars(&self.options.carry_over_prefix, std::env::vars());
        debug!(
            account = %credentials.account,
            uid = identity.uid,
            carried = carried.len(),
            "starting process as another user"
        );

        command
            .env_clear()
            .envs(identity.environment)
            .envs(carried)
            .uid(identity.uid)
            .gid(identity.gid);
        Ok(())
    }

    #[cfg(not(unix))]
    fn impersonate(&self, _command: &mut Command, credentials: &Credentials) -> Result<(), ExecError> {
        Err(ExecError::Impersonation {
            account: credentials.account.to_string(),
            reason: "running a process as another user is not supported on this platform"
                .to_string(),
        })
    }
}

impl ProcessBackend for ProcessExecutor {
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        sink: &'a mut (dyn OutputSink + Send),
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<ProcessOutcome, ExecError>> + Send + 'a>>
    {
        Box::pin(self.run(request, sink))
    }
}

enum SpawnError {
    Io(io::Error),
    Exec(ExecError),
}

impl SpawnError {
    fn describe(&self, executable: &str) -> String {
        match self {
            SpawnError::Io(e) if e.kind() == io::ErrorKind::NotFound => format!(
                "Error when attempting to execute {executable}: {e}. \
                 Make sure {executable} is installed and available on the PATH."
            ),
            SpawnError::Io(e) => format!("Error when attempting to execute {executable}: {e}"),
            SpawnError::Exec(e) => format!("Error when attempting to execute {executable}: {e}"),
        }
    }
}

/// Arguments arrive as one escaped string. Windows hands it to the child
/// verbatim; elsewhere it is split back into argv with the same rules the
/// escaping targets.
#[cfg(windows)]
fn add_arguments(command: &mut Command, arguments: &str) {
    if !arguments.is_empty() {
        command.raw_arg(arguments);
    }
}

#[cfg(not(windows))]
fn add_arguments(command: &mut Command, arguments: &str) {
    command.args(crate::cmdline::split_arguments(arguments));
}

fn exit_code(status: Option<ExitStatus>) -> i32 {
    let Some(status) = status else {
        return -1;
    };
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn spawn_reader<R>(stream: R, encoding: OutputEncoding, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                    }
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    if tx.send(encoding.decode(&buf)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output stream closed with an error");
                    break;
                }
            }
        }
    })
}

/// The two line channels plus the accumulated stderr text.
struct LineStreams {
    stdout: mpsc::Receiver<String>,
    stderr: mpsc::Receiver<String>,
    stdout_open: bool,
    stderr_open: bool,
    errors: String,
}

impl LineStreams {
    fn new(stdout: mpsc::Receiver<String>, stderr: mpsc::Receiver<String>) -> Self {
        Self {
            stdout,
            stderr,
            stdout_open: true,
            stderr_open: true,
            errors: String::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.stdout_open || self.stderr_open
    }

    /// Deliver one line from whichever stream has one ready.
    async fn pump(&mut self, sink: &mut (dyn OutputSink + Send)) {
        tokio::select! {
            line = self.stdout.recv(), if self.stdout_open => match line {
                Some(line) => sink.write_info(&line),
                None => self.stdout_open = false,
            },
            line = self.stderr.recv(), if self.stderr_open => match line {
                Some(line) => {
                    self.errors.push_str(&line);
                    self.errors.push('\n');
                    sink.write_error(&line);
                }
                None => self.stderr_open = false,
            },
            else => {}
        }
    }

    async fn drain(&mut self, sink: &mut (dyn OutputSink + Send)) {
        while self.is_open() {
            self.pump(sink).await;
        }
    }

    fn into_errors(self) -> String {
        self.errors
    }
}
