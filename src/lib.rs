// src/lib.rs

pub mod cli;
pub mod cmdline;
pub mod config;
pub mod errors;
pub mod exec;
pub mod log;
pub mod logging;
pub mod messages;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::cli::CliArgs;
use crate::cmdline::CommandLine;
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default, parse_duration};
use crate::exec::{CommandResult, InvocationRunner, ProcessExecutor, Secret};
use crate::log::{Log, MASK, TracingLog};
use crate::messages::Session;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds one invocation from the CLI, runs it and prints
/// what the process reported. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };

    let mut command_line = CommandLine::new(&args.executable);
    for arg in &args.args {
        command_line = command_line.positional(arg);
    }
    if args.wrapped {
        command_line = command_line.use_wrapped_runtime_named(&config.process.wrapped_runtime);
    }
    let mut invocation = command_line.build()?;

    if args.dry_run {
        print_dry_run(&config, &invocation.to_string());
        return Ok(0);
    }

    let timeout = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow!("invalid --timeout: {e}"))?;

    invocation = invocation
        .isolated(args.isolate)
        .output_to_log(config.output.to_log && !args.quiet_output)
        .output_as_verbose(config.output.as_verbose || args.verbose_output);
    if let Some(timeout) = timeout {
        invocation = invocation.with_timeout(timeout);
    }
    if let Some(cwd) = args.cwd {
        invocation = invocation.with_working_directory(cwd);
    }
    if let Some(user) = &args.user {
        let password = std::env::var("STAGEHAND_PASSWORD")
            .context("--user needs the password in STAGEHAND_PASSWORD")?;
        invocation = invocation.with_credentials(user, Secret::new(password));
    }

    let log: Arc<dyn Log> = Arc::new(TracingLog::new());
    let executor = ProcessExecutor::new(log.clone()).with_options(config.executor_options());
    let runner =
        InvocationRunner::new(executor, log).with_default_timeout(config.process.default_timeout);

    let (result, session) = runner.run_with_session(invocation).await?;
    print_summary(&result, &session);

    Ok(result.exit_code)
}

fn print_dry_run(config: &ConfigFile, command: &str) {
    println!("stagehand dry-run");
    println!("  command: {command}");
    println!(
        "  process.carry_over_env_prefix = {}",
        config.process.carry_over_env_prefix
    );
    println!("  process.default_timeout = {:?}", config.process.default_timeout);
    println!(
        "  output.to_log = {}, output.as_verbose = {}",
        config.output.to_log, config.output.as_verbose
    );

    debug!("dry-run complete (no execution)");
}

fn print_summary(result: &CommandResult, session: &Session) {
    println!("{result}");

    if !session.output_variables.is_empty() {
        println!("output variables ({}):", session.output_variables.len());
        for variable in session.output_variables.iter() {
            let value = if variable.sensitive {
                MASK
            } else {
                variable.value.as_str()
            };
            println!("  - {} = {}", variable.name, value);
        }
    }

    if !session.artifacts.is_empty() {
        println!("artifacts ({}):", session.artifacts.len());
        for artifact in &session.artifacts {
            let path = artifact.path.as_deref().unwrap_or("-");
            println!("  - {} ({path}, {} bytes)", artifact.name, artifact.length);
        }
    }

    if !session.found_packages.is_empty() {
        println!("found packages ({}):", session.found_packages.len());
        for package in &session.found_packages {
            let version = package.version.as_deref().unwrap_or("?");
            println!("  - {} {version} ({:?})", package.id, package.version_format);
        }
    }

    if let Some(delta) = &session.delta_package {
        println!("delta package: {} ({} bytes)", delta.remote_path, delta.size);
    }
    if let Some(error) = &session.delta_package_error {
        println!("delta verification error: {error}");
    }
    if let Some(message) = &session.result_message {
        println!("result: {message}");
    }
    if !session.actions.is_empty() {
        println!("actions ({}):", session.actions.len());
        for action in &session.actions {
            println!("  - {}", action.name);
        }
    }
}
