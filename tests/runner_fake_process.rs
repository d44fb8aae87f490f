// tests/runner_fake_process.rs

mod common;
use crate::common::init_tracing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stagehand::cmdline::{CommandLine, CommandLineInvocation};
use stagehand::exec::{CaptureSink, InvocationError, InvocationRunner, Isolation, Secret};
use stagehand::log::LogLevel;
use stagehand_test_utils::{RecordingLog, ScriptedProcess, message_line, with_timeout};

fn runner(process: ScriptedProcess) -> (InvocationRunner<ScriptedProcess>, Arc<RecordingLog>) {
    let log = Arc::new(RecordingLog::new());
    let runner = InvocationRunner::new(process, log.clone()).with_isolation(Isolation::new());
    (runner, log)
}

#[tokio::test]
async fn packages_output_errors_and_session() {
    init_tracing();

    let process = ScriptedProcess::new()
        .stdout("starting")
        .stdout(message_line("setVariable", &[("name", "Out"), ("value", "42")]))
        .stderr("warning: disk nearly full")
        .stdout("done")
        .exit_code(3);
    let (runner, log) = runner(process.clone());

    let invocation = CommandLine::new("deploy.sh")
        .positional("prod")
        .build()
        .unwrap()
        .with_working_directory("/srv/app");

    let (result, session) = with_timeout(runner.run_with_session(invocation))
        .await
        .unwrap();

    assert_eq!(result.command, r#""deploy.sh" "prod""#);
    assert_eq!(result.exit_code, 3);
    assert_eq!(result.working_directory, PathBuf::from("/srv/app"));
    assert_eq!(result.errors.as_deref(), Some("warning: disk nearly full\n"));
    assert!(result.has_errors());
    assert!(result.verify_success().is_err());

    let output = result.output.unwrap();
    assert!(output.starts_with("starting\n##octopus[setVariable"));
    assert!(output.ends_with("done\n"));

    assert_eq!(session.output_variables.get("out").unwrap().value, "42");
    assert_eq!(log.at(LogLevel::Info), vec!["starting", "done"]);
    assert_eq!(log.at(LogLevel::Error), vec!["warning: disk nearly full"]);

    let requests = process.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].arguments, r#""prod""#);
}

#[tokio::test]
async fn extra_sink_sees_every_line_in_order() {
    let process = ScriptedProcess::new()
        .stdout("a")
        .stderr("b")
        .stdout(message_line("stdout-ignore", &[]))
        .stdout("c");
    let (runner, log) = runner(process);

    let capture = CaptureSink::new();
    let invocation = CommandLineInvocation::new("tool", "").with_additional_sink(capture.clone());

    let result = with_timeout(runner.run(invocation)).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(capture.infos(), vec!["a", "##octopus[stdout-ignore]", "c"]);
    assert_eq!(capture.errors(), vec!["b"]);
    assert_eq!(
        capture.all_messages(),
        vec!["a", "b", "##octopus[stdout-ignore]", "c"]
    );
    // "c" arrives after the ignore switch.
    assert_eq!(log.at(LogLevel::Info), vec!["a"]);
}

#[tokio::test]
async fn output_to_log_off_still_interprets_messages() {
    let process = ScriptedProcess::new()
        .stdout("noise")
        .stdout(message_line("resultMessage", &[("message", "ok")]));
    let (runner, log) = runner(process);

    let invocation = CommandLineInvocation::new("tool", "").output_to_log(false);
    let (_, session) = with_timeout(runner.run_with_session(invocation)).await.unwrap();

    assert!(log.lines().is_empty());
    assert_eq!(session.result_message.as_deref(), Some("ok"));
}

#[tokio::test]
async fn host_failure_becomes_a_result_with_exit_code_minus_one() {
    let process = ScriptedProcess::new().stdout("partial").fail_with("pipe broke");
    let (runner, log) = runner(process);

    let result = with_timeout(runner.run(CommandLineInvocation::new("tool", "")))
        .await
        .unwrap();

    assert_eq!(result.exit_code, -1);
    assert!(result.errors.as_deref().unwrap().contains("pipe broke"));
    assert_eq!(result.output.as_deref(), Some("partial\n"));
    assert!(log.at(LogLevel::Error).iter().any(|l| l.contains("pipe broke")));
}

#[tokio::test]
async fn programmer_errors_fail_before_spawning() {
    let process = ScriptedProcess::new();
    let (runner, _log) = runner(process.clone());

    let err = runner
        .run(CommandLineInvocation::new("   ", "x"))
        .await
        .unwrap_err();
    assert_eq!(err, InvocationError::MissingExecutable);

    let mut invocation = CommandLineInvocation::new("tool", "");
    invocation.password = Some(Secret::new("pw"));
    let err = runner.run(invocation).await.unwrap_err();
    assert_eq!(err, InvocationError::PasswordWithoutUser);

    assert!(process.requests().is_empty());
}

#[tokio::test]
async fn request_carries_environment_credentials_and_timeouts() {
    let process = ScriptedProcess::new();
    let (runner, _log) = runner(process.clone());
    let runner = runner.with_default_timeout(Some(Duration::from_secs(60)));

    let invocation = CommandLineInvocation::new("tool", "")
        .with_env("TentacleHome", "/opt/t")
        .with_credentials(r"CORP\deployer", Secret::new("pw"));
    with_timeout(runner.run(invocation)).await.unwrap();

    let own_timeout = CommandLineInvocation::new("tool", "").with_timeout(Duration::from_secs(5));
    with_timeout(runner.run(own_timeout)).await.unwrap();

    let requests = process.requests();
    assert_eq!(requests[0].timeout, Some(Duration::from_secs(60)));
    assert_eq!(
        requests[0].environment.get("TentacleHome").map(String::as_str),
        Some("/opt/t")
    );
    let credentials = requests[0].credentials.as_ref().unwrap();
    assert_eq!(credentials.account.domain.as_deref(), Some("CORP"));
    assert_eq!(credentials.account.user, "deployer");
    assert_eq!(credentials.password.expose(), "pw");

    assert_eq!(requests[1].timeout, Some(Duration::from_secs(5)));
    assert!(requests[1].credentials.is_none());
}

#[tokio::test]
async fn isolated_invocations_never_overlap() {
    let process = ScriptedProcess::new().sleep(Duration::from_millis(100));
    let (runner, _log) = runner(process.clone());
    let runner = Arc::new(runner);

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move {
            runner
                .run(CommandLineInvocation::new("a", "").isolated(true))
                .await
        })
    };
    let second = {
        let runner = runner.clone();
        tokio::spawn(async move {
            runner
                .run(CommandLineInvocation::new("b", "").isolated(true))
                .await
        })
    };

    with_timeout(async {
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
    })
    .await;

    let mut lifetimes = process.lifetimes();
    assert_eq!(lifetimes.len(), 2);
    lifetimes.sort_by_key(|(start, _)| *start);
    assert!(lifetimes[1].0 >= lifetimes[0].1);
}

#[tokio::test]
async fn non_isolated_invocations_run_concurrently() {
    let process = ScriptedProcess::new().sleep(Duration::from_millis(200));
    let (runner, _log) = runner(process.clone());
    let runner = Arc::new(runner);

    // One isolated run holds the lock; a plain run must not wait for it.
    let isolated = {
        let runner = runner.clone();
        tokio::spawn(async move {
            runner
                .run(CommandLineInvocation::new("a", "").isolated(true))
                .await
        })
    };
    let plain = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(CommandLineInvocation::new("b", "")).await })
    };

    with_timeout(async {
        isolated.await.unwrap().unwrap();
        plain.await.unwrap().unwrap();
    })
    .await;

    let lifetimes = process.lifetimes();
    assert_eq!(lifetimes.len(), 2);
    let (a, b) = (lifetimes[0], lifetimes[1]);
    assert!(a.0 < b.1 && b.0 < a.1, "runs should overlap: {lifetimes:?}");
}
