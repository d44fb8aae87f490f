// src/exec/result.rs

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::messages::MESSAGE_MARKER;

/// The packaged outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// `"<executable>" <arguments>`.
    pub command: String,
    pub exit_code: i32,
    /// Captured stderr, each line followed by `\n`.
    pub errors: Option<String>,
    /// Captured stdout, each line followed by `\n`.
    pub output: Option<String>,
    pub working_directory: PathBuf,
    pub timed_out: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "The following command: {command}\nFailed with exit code: {exit_code}\nWorking directory: {working_directory}"
)]
pub struct CommandFailed {
    pub command: String,
    pub exit_code: i32,
    pub working_directory: String,
    pub errors: Option<String>,
}

impl CommandResult {
    /// True when the captured error text has a non-blank line that is not a
    /// service message.
    pub fn has_errors(&self) -> bool {
        self.errors.as_deref().is_some_and(|errors| {
            errors.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with(MESSAGE_MARKER)
            })
        })
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn verify_success(&self) -> Result<(), CommandFailed> {
        if self.succeeded() {
            return Ok(());
        }
        Err(CommandFailed {
            command: self.command.clone(),
            exit_code: self.exit_code,
            working_directory: self.working_directory.display().to_string(),
            errors: self.errors.clone(),
        })
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exited with code {}", self.command, self.exit_code)?;
        if self.timed_out {
            f.write_str(" (timed out)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_errors(errors: Option<&str>) -> CommandResult {
        CommandResult {
            command: "\"tool\" -x".to_string(),
            exit_code: 0,
            errors: errors.map(str::to_string),
            output: None,
            working_directory: PathBuf::from("/work"),
            timed_out: false,
        }
    }

    #[test]
    fn service_message_lines_are_not_errors() {
        assert!(!result_with_errors(None).has_errors());
        assert!(!result_with_errors(Some("\n   \n")).has_errors());
        assert!(!result_with_errors(Some("##octopus[stderr-progress]\n")).has_errors());
        assert!(result_with_errors(Some("##octopus[stderr-progress]\nboom\n")).has_errors());
    }

    #[test]
    fn verify_success_names_command_and_directory() {
        let mut result = result_with_errors(None);
        assert!(result.verify_success().is_ok());

        result.exit_code = 3;
        let err = result.verify_success().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("\"tool\" -x"));
        assert!(text.contains("exit code: 3"));
        assert!(text.contains("/work"));
    }
}
