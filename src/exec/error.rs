// src/exec/error.rs

use std::io;

use thiserror::Error;

/// Failures of the process machinery itself, as opposed to a process that
/// ran and failed.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("could not start a process as '{account}': {reason}")]
    Impersonation { account: String, reason: String },

    #[error("waiting for {executable} failed: {source}")]
    Wait {
        executable: String,
        #[source]
        source: io::Error,
    },
}

/// Programmer errors caught before any process is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("invocation has no executable")]
    MissingExecutable,

    #[error("a password was supplied without a user name")]
    PasswordWithoutUser,
}
