// src/messages/dispatcher.rs

//! Interprets scanned output: routes plain text by the current stream mode
//! and folds service messages into the invocation's [`Session`].

use std::sync::Arc;

use tracing::{debug, trace};

use super::model::ServiceMessage;
use super::names::{
    create_artifact, delta_verification, found_package, found_package_marker,
    is_script_output_action, progress, result_message, set_variable, stderr, stdout,
};
use super::scanner::{MalformedMessage, OutputSource, ScanEvent};
use super::session::{
    Artifact, DeltaPackage, FoundPackage, OutputVariable, ScriptAction, Session, StdErrMode,
    StdOutMode, VersionFormat,
};
use crate::log::{Log, LogLevel};

/// How plain text is echoed to the [`Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Echo {
    /// Plain text is dropped; messages are still interpreted.
    Off,
    #[default]
    Normal,
    /// Default-mode stdout is written at verbose level.
    Verbose,
}

impl Echo {
    pub fn from_flags(to_log: bool, as_verbose: bool) -> Self {
        match (to_log, as_verbose) {
            (false, _) => Echo::Off,
            (true, false) => Echo::Normal,
            (true, true) => Echo::Verbose,
        }
    }
}

pub struct ServiceMessageDispatcher {
    log: Arc<dyn Log>,
    echo: Echo,
    session: Session,
}

impl std::fmt::Debug for ServiceMessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMessageDispatcher")
            .field("echo", &self.echo)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ServiceMessageDispatcher {
    pub fn new(log: Arc<dyn Log>, echo: Echo) -> Self {
        Self {
            log,
            echo,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Consume one event from the scanner.
    pub fn handle(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Text { source, text } => self.on_plain_text(source, &text),
            ScanEvent::Message {
                message: Ok(message),
                ..
            } => self.on_message(message),
            ScanEvent::Message {
                source,
                message: Err(malformed),
            } => self.on_malformed(source, &malformed),
        }
    }

    /// A body that failed to decode is surfaced as a warning line.
    fn on_malformed(&mut self, source: OutputSource, malformed: &MalformedMessage) {
        debug!(error = %malformed.error, "service message could not be parsed");
        self.on_message(ServiceMessage::new(stdout::WARNING));
        self.on_plain_text(source, &malformed.describe());
        self.on_message(ServiceMessage::new(stdout::DEFAULT));
    }

    pub fn on_plain_text(&mut self, source: OutputSource, text: &str) {
        if self.echo == Echo::Off {
            return;
        }

        let level = match source {
            OutputSource::StdOut => match self.session.stdout_mode {
                StdOutMode::Default if self.echo == Echo::Verbose => Some(LogLevel::Verbose),
                StdOutMode::Default => Some(LogLevel::Info),
                StdOutMode::Error => Some(LogLevel::Error),
                StdOutMode::Ignore => None,
                StdOutMode::Verbose => Some(LogLevel::Verbose),
                StdOutMode::Warning => Some(LogLevel::Warn),
                StdOutMode::Highlight => Some(LogLevel::Highlight),
                StdOutMode::Wait => Some(LogLevel::Wait),
            },
            OutputSource::StdErr => match self.session.stderr_mode {
                StdErrMode::Default | StdErrMode::Error => Some(LogLevel::Error),
                StdErrMode::Ignore => None,
                StdErrMode::Progress => Some(LogLevel::Verbose),
            },
        };

        if let Some(level) = level {
            self.log.write(level, text);
        }
    }

    pub fn on_message(&mut self, message: ServiceMessage) {
        trace!(name = message.name(), "service message");
        self.session.service_messages.push(message.clone());

        if self.switch_mode(message.name()) {
            return;
        }

        match message.name() {
            set_variable::NAME => self.on_set_variable(&message),
            progress::NAME => self.on_progress(&message),
            create_artifact::NAME => self.on_create_artifact(&message),
            result_message::NAME => {
                if let Some(text) = message.get(result_message::MESSAGE_ATTRIBUTE) {
                    self.session.result_message = Some(text.to_string());
                }
            }
            found_package_marker::NAME => self.session.found_package_marker = true,
            found_package::NAME => self.on_found_package(&message),
            delta_verification::NAME => self.on_delta_verification(&message),
            name if is_script_output_action(name) => {
                self.session.actions.push(ScriptAction {
                    name: name.to_string(),
                    properties: message.attributes().clone(),
                });
            }
            name => debug!(name, "ignoring unrecognised service message"),
        }
    }

    fn switch_mode(&mut self, name: &str) -> bool {
        let stdout_mode = match name {
            stdout::DEFAULT => Some(StdOutMode::Default),
            stdout::ERROR => Some(StdOutMode::Error),
            stdout::IGNORE => Some(StdOutMode::Ignore),
            stdout::VERBOSE => Some(StdOutMode::Verbose),
            stdout::WARNING => Some(StdOutMode::Warning),
            stdout::HIGHLIGHT => Some(StdOutMode::Highlight),
            stdout::WAIT => Some(StdOutMode::Wait),
            _ => None,
        };
        if let Some(mode) = stdout_mode {
            self.session.stdout_mode = mode;
            return true;
        }

        let stderr_mode = match name {
            stderr::DEFAULT => Some(StdErrMode::Default),
            stderr::ERROR => Some(StdErrMode::Error),
            stderr::IGNORE => Some(StdErrMode::Ignore),
            stderr::PROGRESS => Some(StdErrMode::Progress),
            _ => None,
        };
        if let Some(mode) = stderr_mode {
            self.session.stderr_mode = mode;
            return true;
        }

        false
    }

    fn on_set_variable(&mut self, message: &ServiceMessage) {
        let Some(name) = message.get(set_variable::NAME_ATTRIBUTE) else {
            return;
        };
        let value = message
            .get(set_variable::VALUE_ATTRIBUTE)
            .unwrap_or_default()
            .to_string();
        let sensitive = message
            .get(set_variable::SENSITIVE_ATTRIBUTE)
            .and_then(parse_bool)
            .unwrap_or(false);

        if sensitive {
            self.log.mask_sensitive(&value);
        }

        self.session.output_variables.set(OutputVariable {
            name: name.to_string(),
            value,
            sensitive,
        });
    }

    fn on_progress(&mut self, message: &ServiceMessage) {
        let Some(percentage) = message
            .get(progress::PERCENTAGE)
            .and_then(|p| p.trim().parse::<i32>().ok())
        else {
            return;
        };
        self.log
            .progress(percentage, message.get(progress::MESSAGE));
    }

    fn on_create_artifact(&mut self, message: &ServiceMessage) {
        let Some(name) = message.get(create_artifact::NAME_ATTRIBUTE) else {
            return;
        };
        let length = message
            .get(create_artifact::LENGTH_ATTRIBUTE)
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(0);

        self.session.artifacts.push(Artifact {
            name: name.to_string(),
            path: message
                .get(create_artifact::PATH_ATTRIBUTE)
                .map(str::to_string),
            length,
        });
    }

    fn on_found_package(&mut self, message: &ServiceMessage) {
        let Some(id) = message.get(found_package::ID_ATTRIBUTE) else {
            return;
        };
        let owned = |key: &str| message.get(key).map(str::to_string);

        self.session.found_packages.push(FoundPackage {
            id: id.to_string(),
            version: owned(found_package::VERSION_ATTRIBUTE),
            version_format: VersionFormat::parse_or_default(
                message.get(found_package::VERSION_FORMAT_ATTRIBUTE),
            ),
            remote_path: owned(found_package::REMOTE_PATH_ATTRIBUTE),
            hash: owned(found_package::HASH_ATTRIBUTE),
            file_extension: owned(found_package::FILE_EXTENSION_ATTRIBUTE),
        });
    }

    fn on_delta_verification(&mut self, message: &ServiceMessage) {
        self.session.delta_package_error = message
            .get(delta_verification::ERROR_ATTRIBUTE)
            .map(str::to_string);

        let remote_path = message.get(delta_verification::REMOTE_PATH_ATTRIBUTE);
        let hash = message.get(delta_verification::HASH_ATTRIBUTE);
        let size = message
            .get(delta_verification::SIZE_ATTRIBUTE)
            .and_then(|s| s.trim().parse::<i64>().ok());

        if let (Some(remote_path), Some(hash), Some(size)) = (remote_path, hash, size) {
            self.session.delta_package = Some(DeltaPackage {
                remote_path: remote_path.to_string(),
                hash: hash.to_string(),
                size,
            });
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
