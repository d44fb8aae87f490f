use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stagehand::exec::{ExecError, OutputSink, ProcessBackend, ProcessOutcome, ProcessRequest};

/// One thing a scripted process does.
#[derive(Debug, Clone)]
pub enum Step {
    Stdout(String),
    Stderr(String),
    Sleep(Duration),
}

#[derive(Debug, Default)]
struct Record {
    requests: Vec<ProcessRequest>,
    lifetimes: Vec<(Instant, Instant)>,
}

/// A fake [`ProcessBackend`] that:
/// - replays scripted stdout/stderr lines and pauses
/// - records every request and the start/end instant of each run.
///
/// Clones share the record, so keep one handle and give the other to the
/// runner.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProcess {
    steps: Vec<Step>,
    exit_code: i32,
    failure: Option<String>,
    record: Arc<Mutex<Record>>,
}

impl ScriptedProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, line: impl Into<String>) -> Self {
        self.steps.push(Step::Stdout(line.into()));
        self
    }

    pub fn stderr(mut self, line: impl Into<String>) -> Self {
        self.steps.push(Step::Stderr(line.into()));
        self
    }

    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Sleep(duration));
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Fail with a host error after replaying the steps.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn requests(&self) -> Vec<ProcessRequest> {
        self.record.lock().unwrap().requests.clone()
    }

    pub fn lifetimes(&self) -> Vec<(Instant, Instant)> {
        self.record.lock().unwrap().lifetimes.clone()
    }
}

impl ProcessBackend for ScriptedProcess {
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        sink: &'a mut (dyn OutputSink + Send),
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutcome, ExecError>> + Send + 'a>> {
        Box::pin(async move {
            let started = Instant::now();
            let executable = request.executable.clone();
            self.record.lock().unwrap().requests.push(request);

            let mut errors = String::new();
            for step in &self.steps {
                match step {
                    Step::Stdout(line) => sink.write_info(line),
                    Step::Stderr(line) => {
                        errors.push_str(line);
                        errors.push('\n');
                        sink.write_error(line);
                    }
                    Step::Sleep(duration) => tokio::time::sleep(*duration).await,
                }
            }

            self.record
                .lock()
                .unwrap()
                .lifetimes
                .push((started, Instant::now()));

            if let Some(message) = &self.failure {
                return Err(ExecError::Wait {
                    executable,
                    source: io::Error::other(message.clone()),
                });
            }

            Ok(ProcessOutcome {
                exit_code: self.exit_code,
                errors,
                timed_out: false,
                pid: None,
            })
        })
    }
}
