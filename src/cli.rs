// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stagehand`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Run a deployment tool and interpret the service messages it writes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing `Stagehand.toml` in the current directory means built-in
    /// defaults; any other missing path is an error.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGEHAND_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Kill the process after this long (e.g. `90s`, `10m`).
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Working directory for the process.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Never run concurrently with another isolated invocation.
    #[arg(long)]
    pub isolate: bool,

    /// Run as this account (`user` or `DOMAIN\user`). The password is read
    /// from `STAGEHAND_PASSWORD`. Without a password check installed the run
    /// fails to start.
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Launch the executable through the configured wrapped runtime.
    #[arg(long)]
    pub wrapped: bool,

    /// Echo default stdout at verbose level.
    #[arg(long)]
    pub verbose_output: bool,

    /// Do not echo plain output; service messages are still interpreted.
    #[arg(long, conflicts_with = "verbose_output")]
    pub quiet_output: bool,

    /// Print the command line that would run, without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Executable to run.
    #[arg(value_name = "EXECUTABLE")]
    pub executable: String,

    /// Arguments passed to the executable, each quoted as one argument.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_arguments_keep_their_hyphens() {
        let args = CliArgs::try_parse_from([
            "stagehand", "--isolate", "--timeout", "90s", "terraform", "apply", "-no-color",
        ])
        .unwrap();

        assert!(args.isolate);
        assert_eq!(args.timeout.as_deref(), Some("90s"));
        assert_eq!(args.executable, "terraform");
        assert_eq!(args.args, vec!["apply", "-no-color"]);
    }

    #[test]
    fn quiet_and_verbose_output_conflict() {
        let parsed =
            CliArgs::try_parse_from(["stagehand", "--quiet-output", "--verbose-output", "tool"]);
        assert!(parsed.is_err());
    }
}
