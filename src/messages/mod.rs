// src/messages/mod.rs

//! The service-message protocol carried inside process output.
//!
//! - [`model`] is the decoded [`ServiceMessage`] and its wire form.
//! - [`names`] lists the message and attribute names the agent understands.
//! - [`scanner`] splits a character stream into plain text and messages.
//! - [`dispatcher`] routes plain text by stream mode and folds messages into
//!   a [`Session`].
//! - [`session`] holds the value types a run reports back to its caller.

pub mod dispatcher;
pub mod model;
pub mod names;
pub mod scanner;
pub mod session;

pub use dispatcher::{Echo, ServiceMessageDispatcher};
pub use model::{MESSAGE_MARKER, MessageParseError, ServiceMessage};
pub use scanner::{MalformedMessage, OutputSource, ScanEvent, ServiceMessageScanner};
pub use session::{
    Artifact, DeltaPackage, FoundPackage, OutputVariable, OutputVariables, ScriptAction, Session,
    StdErrMode, StdOutMode, VersionFormat,
};
