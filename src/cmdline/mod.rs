// src/cmdline/mod.rs

//! Command-line construction.
//!
//! - [`builder`] turns typed argument descriptors into an argument list,
//!   either escaped for a native process or raw for an in-process call.
//! - [`escape`] holds the quoting rule and the splitter that undoes it.
//! - [`invocation`] defines the fully-specified request handed to the
//!   invocation runner.

pub mod builder;
pub mod escape;
pub mod invocation;

pub use builder::{Arg, ArgValue, CommandLine, CommandLineError, DEFAULT_WRAPPED_RUNTIME};
pub use escape::{escape_argument, split_arguments};
pub use invocation::{CommandLineInvocation, LibraryCallInvocation, LibraryEntryPoint};
