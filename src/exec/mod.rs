// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the `ProcessBackend` trait the runner talks to, so
//!   tests can replace real processes with scripted ones.
//! - [`process`] is the real backend built on `tokio::process`.
//! - [`runner`] turns an invocation into a [`CommandResult`].
//! - [`sink`] holds the output consumers a run fans lines out to.
//! - [`credentials`], [`encoding`] and [`isolation`] cover running as
//!   another user, decoding output and serialising isolated runs.

pub mod backend;
pub mod credentials;
pub mod encoding;
mod error;
pub mod isolation;
pub mod process;
pub mod result;
pub mod runner;
pub mod sink;

pub use backend::{ProcessBackend, ProcessOutcome, ProcessRequest};
pub use credentials::{
    AccountName, Authenticator, Credentials, NoopSessionAccess, RejectPasswords, Secret,
    SessionAccess,
};
pub use encoding::OutputEncoding;
pub use error::{ExecError, InvocationError};
pub use isolation::Isolation;
pub use process::{ExecutorOptions, ProcessExecutor};
pub use result::{CommandFailed, CommandResult};
pub use runner::InvocationRunner;
pub use sink::{CaptureSink, FanOutSink, OutputSink, ServiceMessageSink};
