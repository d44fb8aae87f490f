// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::cmdline::CommandLineError;
use crate::exec::InvocationError;

#[derive(Error, Debug)]
pub enum StagehandError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    CommandLine(#[from] CommandLineError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StagehandError>;
