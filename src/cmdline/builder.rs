// src/cmdline/builder.rs

//! Typed command-line builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::escape::escape_argument;
use super::invocation::{CommandLineInvocation, LibraryCallInvocation, LibraryEntryPoint};

/// Launcher used when a command line is switched to the wrapped runtime and
/// no other launcher was configured.
pub const DEFAULT_WRAPPED_RUNTIME: &str = "dotnet";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandLineError {
    #[error("Action is already set to '{0}'")]
    ActionAlreadySet(String),

    #[error("Executable was not specified")]
    MissingExecutable,

    #[error("Library call function was not specified")]
    MissingEntryPoint,

    #[error("{0} name must not be blank")]
    BlankName(&'static str),
}

/// A single argument value.
///
/// Numbers are rendered with Rust's `Display`, which never depends on the
/// host locale. Booleans render as `True`/`False`, the form .NET-style
/// switch parsers expect.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Int(n) => write!(f, "{n}"),
            ArgValue::UInt(n) => write!(f, "{n}"),
            ArgValue::Float(n) => write!(f, "{n}"),
            ArgValue::Bool(true) => f.write_str("True"),
            ArgValue::Bool(false) => f.write_str("False"),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<&String> for ArgValue {
    fn from(value: &String) -> Self {
        ArgValue::Text(value.clone())
    }
}

impl From<&Path> for ArgValue {
    fn from(value: &Path) -> Self {
        ArgValue::Text(value.display().to_string())
    }
}

impl From<PathBuf> for ArgValue {
    fn from(value: PathBuf) -> Self {
        ArgValue::Text(value.display().to_string())
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::UInt(u64::from(value))
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        ArgValue::UInt(value)
    }
}

impl From<usize> for ArgValue {
    fn from(value: usize) -> Self {
        ArgValue::UInt(value as u64)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

/// Argument descriptor, rendered in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `<value>`
    Positional(ArgValue),
    /// `-name <value>`; a blank name renders like a positional value.
    Named(String, ArgValue),
    /// `-name`
    Flag(String),
    /// `name`, always first on the line.
    RawAction(String),
}

impl Arg {
    /// Render as a single command-line token, quoting values when `escape`
    /// is set.
    pub fn render(&self, escape: bool) -> String {
        match self {
            Arg::Flag(name) => format!("-{}", name.trim()),
            Arg::RawAction(name) => name.trim().to_string(),
            Arg::Positional(value) => render_value(value, escape),
            Arg::Named(name, value) => {
                let value = render_value(value, escape);
                if name.trim().is_empty() {
                    value
                } else {
                    format!("-{} {}", name.trim(), value)
                }
            }
        }
    }

    /// Unescaped form where a named argument becomes two elements.
    pub fn raw(&self) -> Vec<String> {
        match self {
            Arg::Named(name, value) if !name.trim().is_empty() => {
                vec![format!("-{}", name.trim()), value.to_string()]
            }
            other => vec![other.render(false)],
        }
    }
}

fn render_value(value: &ArgValue, escape: bool) -> String {
    let text = value.to_string();
    if escape { escape_argument(&text) } else { text }
}

enum Target {
    Executable(String),
    Library(LibraryEntryPoint),
}

/// Builder for a native process invocation or an in-process library call.
///
/// ```ignore
/// let invocation = CommandLine::new("terraform")
///     .action("apply")?
///     .flag("no-color")
///     .named("parallelism", 4)
///     .build()?;
/// ```
pub struct CommandLine {
    target: Target,
    args: Vec<Arg>,
    action: Option<String>,
    wrapped_runtime: Option<String>,
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            Target::Executable(exe) => exe.as_str(),
            Target::Library(_) => "<library call>",
        };
        f.debug_struct("CommandLine")
            .field("target", &target)
            .field("args", &self.args)
            .field("action", &self.action)
            .field("wrapped_runtime", &self.wrapped_runtime)
            .finish()
    }
}

impl CommandLine {
    pub fn new(executable: impl Into<String>) -> Self {
        Self::with_target(Target::Executable(executable.into()))
    }

    pub fn library<F>(entry: F) -> Self
    where
        F: Fn(&[String]) -> i32 + Send + Sync + 'static,
    {
        Self::with_target(Target::Library(Arc::new(entry)))
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            args: Vec::new(),
            action: None,
            wrapped_runtime: None,
        }
    }

    /// Set the action verb. It is always rendered first, and only one may be
    /// set.
    pub fn action(mut self, name: impl Into<String>) -> Result<Self, CommandLineError> {
        if let Some(existing) = &self.action {
            return Err(CommandLineError::ActionAlreadySet(existing.clone()));
        }
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CommandLineError::BlankName("action"));
        }
        self.args.insert(0, Arg::RawAction(name.clone()));
        self.action = Some(name);
        Ok(self)
    }

    pub fn positional(mut self, value: impl Into<ArgValue>) -> Self {
        self.args.push(Arg::Positional(value.into()));
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push(Arg::Named(name.into(), value.into()));
        self
    }

    /// A blank flag name is reported by [`build`](Self::build).
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.args.push(Arg::Flag(name.into()));
        self
    }

    /// Launch through [`DEFAULT_WRAPPED_RUNTIME`], passing the executable as
    /// the first argument.
    pub fn use_wrapped_runtime(self) -> Self {
        self.use_wrapped_runtime_named(DEFAULT_WRAPPED_RUNTIME)
    }

    pub fn use_wrapped_runtime_named(mut self, launcher: impl Into<String>) -> Self {
        self.wrapped_runtime = Some(launcher.into());
        self
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Build an invocation for a native process with every value quoted.
    pub fn build(&self) -> Result<CommandLineInvocation, CommandLineError> {
        let executable = match &self.target {
            Target::Executable(exe) if !exe.trim().is_empty() => exe.clone(),
            _ => return Err(CommandLineError::MissingExecutable),
        };
        self.check_flags()?;

        let mut line: Vec<Arg> = Vec::with_capacity(self.args.len() + 1);
        let actual = match &self.wrapped_runtime {
            Some(launcher) => {
                line.push(Arg::Positional(ArgValue::Text(executable)));
                launcher.clone()
            }
            None => executable,
        };
        line.extend(self.args.iter().cloned());

        let arguments = line
            .iter()
            .map(|arg| arg.render(true))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(CommandLineInvocation::new(actual, arguments))
    }

    /// Build an in-process call; values are passed through unescaped.
    pub fn build_library_call(&self) -> Result<LibraryCallInvocation, CommandLineError> {
        self.check_flags()?;
        match &self.target {
            Target::Library(entry) => Ok(LibraryCallInvocation::new(
                Arc::clone(entry),
                self.args.iter().map(|arg| arg.render(false)).collect(),
            )),
            Target::Executable(_) => Err(CommandLineError::MissingEntryPoint),
        }
    }

    fn check_flags(&self) -> Result<(), CommandLineError> {
        let blank = self
            .args
            .iter()
            .any(|arg| matches!(arg, Arg::Flag(name) if name.trim().is_empty()));
        if blank {
            return Err(CommandLineError::BlankName("flag"));
        }
        Ok(())
    }

    /// Unescaped arguments with named arguments split into name and value.
    pub fn raw_args(&self) -> Vec<String> {
        self.args.iter().flat_map(Arg::raw).collect()
    }
}
