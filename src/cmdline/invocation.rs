// src/cmdline/invocation.rs

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::exec::credentials::Secret;
use crate::exec::sink::OutputSink;

/// Entry point of an in-process tool, returning its exit code.
pub type LibraryEntryPoint = Arc<dyn Fn(&[String]) -> i32 + Send + Sync>;

/// A fully-specified request to run one external process.
///
/// Built by callers (usually through [`super::CommandLine::build`]) and
/// consumed once by [`crate::exec::InvocationRunner`].
pub struct CommandLineInvocation {
    pub executable: String,
    /// Already-escaped argument string.
    pub arguments: String,
    /// Defaults to the current directory of this process.
    pub working_directory: Option<PathBuf>,
    /// `user` or `DOMAIN\user`; only used together with `password`.
    pub user_name: Option<String>,
    pub password: Option<Secret>,
    pub environment_vars: Option<HashMap<String, String>>,
    /// Never run concurrently with another isolated invocation.
    pub isolate: bool,
    /// Echo plain output to the log.
    pub output_to_log: bool,
    /// Echo default-mode stdout at verbose level instead of info.
    pub output_as_verbose: bool,
    pub additional_sink: Option<Box<dyn OutputSink + Send>>,
    /// Falls back to the configured default timeout when `None`.
    pub timeout: Option<Duration>,
}

impl CommandLineInvocation {
    pub fn new(executable: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: arguments.into(),
            working_directory: None,
            user_name: None,
            password: None,
            environment_vars: None,
            isolate: false,
            output_to_log: true,
            output_as_verbose: false,
            additional_sink: None,
            timeout: None,
        }
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_credentials(mut self, user_name: impl Into<String>, password: Secret) -> Self {
        self.user_name = Some(user_name.into());
        self.password = Some(password);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_vars
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_environment(mut self, vars: HashMap<String, String>) -> Self {
        self.environment_vars = Some(vars);
        self
    }

    pub fn isolated(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    pub fn output_to_log(mut self, enabled: bool) -> Self {
        self.output_to_log = enabled;
        self
    }

    pub fn output_as_verbose(mut self, enabled: bool) -> Self {
        self.output_as_verbose = enabled;
        self
    }

    pub fn with_additional_sink(mut self, sink: impl OutputSink + Send + 'static) -> Self {
        self.additional_sink = Some(Box::new(sink));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for CommandLineInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}", self.executable, self.arguments)
    }
}

impl fmt::Debug for CommandLineInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLineInvocation")
            .field("executable", &self.executable)
            .field("arguments", &self.arguments)
            .field("working_directory", &self.working_directory)
            .field("user_name", &self.user_name)
            .field("password", &self.password)
            .field("environment_vars", &self.environment_vars)
            .field("isolate", &self.isolate)
            .field("output_to_log", &self.output_to_log)
            .field("output_as_verbose", &self.output_as_verbose)
            .field("additional_sink", &self.additional_sink.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// An in-process call with unescaped arguments.
pub struct LibraryCallInvocation {
    entry: LibraryEntryPoint,
    pub arguments: Vec<String>,
}

impl LibraryCallInvocation {
    pub fn new(entry: LibraryEntryPoint, arguments: Vec<String>) -> Self {
        Self { entry, arguments }
    }

    pub fn invoke(&self) -> i32 {
        (self.entry)(&self.arguments)
    }
}

impl fmt::Debug for LibraryCallInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryCallInvocation")
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
