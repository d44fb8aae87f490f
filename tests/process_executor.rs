// tests/process_executor.rs
//
// Runs real processes through `sh`, so Unix only.
#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::unistd::{User, getuid};
use stagehand::cmdline::{CommandLine, CommandLineInvocation, escape_argument};
use stagehand::exec::{
    AccountName, Authenticator, CaptureSink, Credentials, ExecError, ExecutorOptions,
    InvocationRunner, Isolation, OutputEncoding, ProcessExecutor, ProcessRequest, Secret,
    SessionAccess,
};
use stagehand::log::LogLevel;
use stagehand_test_utils::{RecordingLog, with_timeout};

fn executor(log: Arc<RecordingLog>) -> ProcessExecutor {
    ProcessExecutor::new(log)
        .with_encoding(OutputEncoding::Utf8)
        .with_options(ExecutorOptions {
            reap_grace: Duration::from_secs(2),
            drain_grace: Duration::from_secs(2),
            ..ExecutorOptions::default()
        })
}

fn shell(script: &str) -> ProcessRequest {
    ProcessRequest::new("sh", format!("-c {}", escape_argument(script)))
}

#[tokio::test]
async fn streams_stdout_and_stderr_and_collects_errors() {
    init_tracing();
    let log = Arc::new(RecordingLog::new());
    let executor = executor(log);
    let mut sink = CaptureSink::new();

    let outcome = with_timeout(executor.run(
        shell("echo one; echo two; echo bad >&2; printf 'no newline'; exit 4"),
        &mut sink,
    ))
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, 4);
    assert!(!outcome.timed_out);
    assert!(outcome.pid.is_some());
    assert_eq!(outcome.errors, "bad\n");
    assert_eq!(sink.infos(), vec!["one", "two", "no newline"]);
    assert_eq!(sink.errors(), vec!["bad"]);
}

#[tokio::test]
async fn missing_executable_reports_minus_one_with_a_hint() {
    let log = Arc::new(RecordingLog::new());
    let executor = executor(log);
    let mut sink = CaptureSink::new();

    let outcome = with_timeout(executor.run(
        ProcessRequest::new("definitely-not-a-real-tool-1234", ""),
        &mut sink,
    ))
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, -1);
    assert!(outcome.errors.contains("definitely-not-a-real-tool-1234"));
    assert!(outcome.errors.contains("installed and available on the PATH"));
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.errors()[0].contains("definitely-not-a-real-tool-1234"));
}

#[tokio::test]
async fn timeout_kills_the_process_and_keeps_earlier_output() {
    let log = Arc::new(RecordingLog::new());
    let executor = executor(log.clone());
    let mut sink = CaptureSink::new();

    let mut request = shell("echo before; sleep 30; echo after");
    request.timeout = Some(Duration::from_millis(300));

    let started = Instant::now();
    let outcome = with_timeout(executor.run(request, &mut sink)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(outcome.timed_out);
    assert_ne!(outcome.exit_code, 0);
    assert_eq!(sink.infos(), vec!["before"]);

    let errors = log.at(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Process with ID "));
    assert!(errors[0].contains("exceeded the max allowed runtime"));
}

#[tokio::test]
async fn environment_and_working_directory_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(RecordingLog::new());
    let executor = executor(log);
    let mut sink = CaptureSink::new();

    let mut request = shell("echo \"$STAGEHAND_TEST_VALUE\"; pwd");
    request.working_directory = dir.path().to_path_buf();
    request
        .environment
        .insert("STAGEHAND_TEST_VALUE".to_string(), "from env".to_string());

    let outcome = with_timeout(executor.run(request, &mut sink)).await.unwrap();
    assert_eq!(outcome.exit_code, 0);

    let infos = sink.infos();
    assert_eq!(infos[0], "from env");
    let reported = std::fs::canonicalize(&infos[1]).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn runner_over_real_processes_reads_service_messages() {
    let log = Arc::new(RecordingLog::new());
    let runner = InvocationRunner::new(executor(log.clone()), log.clone())
        .with_isolation(Isolation::new());

    // base64("Greeting") / base64("hi there")
    let script = r#"echo 'start'; echo '##octopus[setVariable name="R3JlZXRpbmc=" value="aGkgdGhlcmU="]'; echo 'end'"#;
    let invocation = CommandLine::new("sh")
        .flag("c")
        .positional(script)
        .build()
        .unwrap();

    let (result, session) = with_timeout(runner.run_with_session(invocation))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(!result.has_errors());
    assert_eq!(
        session.output_variables.get("greeting").unwrap().value,
        "hi there"
    );
    assert_eq!(log.at(LogLevel::Info), vec!["start", "end"]);
}

#[tokio::test]
async fn missing_executable_through_the_runner_is_a_result() {
    let log = Arc::new(RecordingLog::new());
    let runner = InvocationRunner::new(executor(log.clone()), log.clone());

    let result = with_timeout(runner.run(CommandLineInvocation::new("no-such-binary-xyz", "")))
        .await
        .unwrap();

    assert_eq!(result.exit_code, -1);
    assert!(result.has_errors());
    assert!(result.errors.unwrap().contains("no-such-binary-xyz"));
    assert!(
        log.at(LogLevel::Error)
            .iter()
            .any(|line| line.contains("installed and available on the PATH"))
    );
}

/// Accepts exactly one password for every account.
struct KnownPassword(&'static str);

impl Authenticator for KnownPassword {
    fn authenticate(&self, account: &AccountName, password: &Secret) -> Result<(), ExecError> {
        if password.expose() == self.0 {
            Ok(())
        } else {
            Err(ExecError::Impersonation {
                account: account.to_string(),
                reason: "wrong password".to_string(),
            })
        }
    }
}

#[derive(Default, Clone)]
struct RecordingAccess {
    granted: Arc<Mutex<Vec<String>>>,
}

impl SessionAccess for RecordingAccess {
    fn grant(&self, account: &AccountName) -> Result<(), ExecError> {
        self.granted.lock().unwrap().push(account.to_string());
        Ok(())
    }
}

struct DenyingAccess;

impl SessionAccess for DenyingAccess {
    fn grant(&self, account: &AccountName) -> Result<(), ExecError> {
        Err(ExecError::Impersonation {
            account: account.to_string(),
            reason: "desktop access denied".to_string(),
        })
    }
}

/// Name of the account the tests run as, if it has a passwd entry.
fn current_user() -> Option<String> {
    User::from_uid(getuid()).ok().flatten().map(|user| user.name)
}

fn as_user(script: &str, user: &str, password: &str) -> ProcessRequest {
    let mut request = shell(script);
    request.credentials = Some(Credentials::new(user, Secret::new(password)));
    request
}

#[tokio::test]
async fn wrong_password_never_starts_the_process() {
    let Some(user) = current_user() else { return };
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let script = format!("touch {}", escape_argument(&marker.display().to_string()));

    // Default executor: no way to check a password, so nothing starts.
    let log = Arc::new(RecordingLog::new());
    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor(log).run(as_user(&script, &user, "anything"), &mut sink))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, -1);
    assert!(outcome.errors.contains("password authentication is not supported"));
    assert_eq!(sink.errors().len(), 1);

    // A real check that says no.
    let access = RecordingAccess::default();
    let executor = executor(Arc::new(RecordingLog::new()))
        .with_authenticator(Arc::new(KnownPassword("right")))
        .with_session_access(Arc::new(access.clone()));
    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor.run(as_user(&script, &user, "wrong"), &mut sink))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, -1);
    assert!(outcome.errors.contains("wrong password"));

    assert!(!marker.exists());
    assert!(access.granted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_access_is_granted_before_start_and_can_refuse() {
    let Some(user) = current_user() else { return };
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let script = format!("touch {}", escape_argument(&marker.display().to_string()));

    let access = RecordingAccess::default();
    let executor = executor(Arc::new(RecordingLog::new()))
        .with_authenticator(Arc::new(KnownPassword("right")))
        .with_session_access(Arc::new(access.clone()));
    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor.run(as_user(&script, &user, "right"), &mut sink))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(*access.granted.lock().unwrap(), vec![user.clone()]);
    assert!(marker.exists());

    std::fs::remove_file(&marker).unwrap();
    let executor = executor.with_session_access(Arc::new(DenyingAccess));
    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor.run(as_user(&script, &user, "right"), &mut sink))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, -1);
    assert!(outcome.errors.contains("desktop access denied"));
    assert!(!marker.exists());
}

#[tokio::test]
async fn other_account_starts_with_a_fresh_environment() {
    let Some(user) = current_user() else { return };
    // cargo sets this for test runs; it stands in for an agent variable.
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else { return };

    let script = r#"echo "$USER|$PATH|$CARGO_MANIFEST_DIR|$STAGEHAND_OVERRIDE""#;
    let authenticated = |prefix: &str| {
        executor(Arc::new(RecordingLog::new()))
            .with_authenticator(Arc::new(KnownPassword("right")))
            .with_options(ExecutorOptions {
                carry_over_prefix: prefix.to_string(),
                ..ExecutorOptions::default()
            })
    };
    let request = || {
        let mut request = as_user(script, &user, "right");
        request
            .environment
            .insert("STAGEHAND_OVERRIDE".to_string(), "set".to_string());
        request
    };

    let mut sink = CaptureSink::new();
    let outcome = with_timeout(authenticated("CARGO_MANIFEST").run(request(), &mut sink))
        .await
        .unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        sink.infos(),
        vec![format!("{user}|/usr/local/bin:/usr/bin:/bin|{manifest_dir}|set")]
    );

    // Without a matching prefix the parent's variable does not leak through.
    let mut sink = CaptureSink::new();
    with_timeout(authenticated("Tentacle").run(request(), &mut sink))
        .await
        .unwrap();
    assert_eq!(
        sink.infos(),
        vec![format!("{user}|/usr/local/bin:/usr/bin:/bin||set")]
    );
}

#[tokio::test]
async fn switches_to_another_account_when_root() {
    if !getuid().is_root() || User::from_name("nobody").ok().flatten().is_none() {
        return;
    }

    let executor = executor(Arc::new(RecordingLog::new()))
        .with_authenticator(Arc::new(KnownPassword("right")));
    let mut request = as_user("id -un", "nobody", "right");
    request.working_directory = "/".into();

    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor.run(request, &mut sink)).await.unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(sink.infos(), vec!["nobody"]);

    let mut request = as_user("id -un", "nobody", "wrong");
    request.working_directory = "/".into();
    let mut sink = CaptureSink::new();
    let outcome = with_timeout(executor.run(request, &mut sink)).await.unwrap();
    assert_eq!(outcome.exit_code, -1);
    assert!(sink.infos().is_empty());
}
