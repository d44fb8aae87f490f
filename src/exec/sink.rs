// src/exec/sink.rs

//! Consumers of process output lines.
//!
//! Every line a process writes is handed to an [`OutputSink`] exactly once,
//! in arrival order. The runner fans lines out to several sinks through
//! [`FanOutSink`]; sinks see each line in registration order before the next
//! line is delivered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::log::Log;
use crate::messages::{
    Echo, OutputSource, ScanEvent, ServiceMessageDispatcher, ServiceMessageScanner, Session,
};

pub trait OutputSink {
    fn write_info(&mut self, line: &str);
    fn write_error(&mut self, line: &str);
}

/// Delivers each line to every registered sink, in registration order.
#[derive(Default)]
pub struct FanOutSink<'a> {
    sinks: Vec<&'a mut (dyn OutputSink + Send)>,
}

impl<'a> FanOutSink<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: &'a mut (dyn OutputSink + Send)) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutputSink for FanOutSink<'_> {
    fn write_info(&mut self, line: &str) {
        for sink in self.sinks.iter_mut() {
            sink.write_info(line);
        }
    }

    fn write_error(&mut self, line: &str) {
        for sink in self.sinks.iter_mut() {
            sink.write_error(line);
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    infos: Vec<String>,
    errors: Vec<String>,
    all_messages: Vec<String>,
}

/// Records lines for later inspection.
///
/// Clones share the same buffers, so a caller can keep one handle and give
/// the other to an invocation as its extra sink.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    inner: Arc<Mutex<Captured>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn infos(&self) -> Vec<String> {
        self.lock().infos.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock().errors.clone()
    }

    /// Stdout and stderr lines interleaved in arrival order.
    pub fn all_messages(&self) -> Vec<String> {
        self.lock().all_messages.clone()
    }
}

impl OutputSink for CaptureSink {
    fn write_info(&mut self, line: &str) {
        let mut captured = self.lock();
        captured.infos.push(line.to_string());
        captured.all_messages.push(line.to_string());
    }

    fn write_error(&mut self, line: &str) {
        let mut captured = self.lock();
        captured.errors.push(line.to_string());
        captured.all_messages.push(line.to_string());
    }
}

/// Scans lines for service messages and dispatches them.
///
/// Each line is scanned and then flushed, so a message left open at the end
/// of a line comes out as plain text instead of swallowing later lines.
#[derive(Debug)]
pub struct ServiceMessageSink {
    scanner: ServiceMessageScanner,
    dispatcher: ServiceMessageDispatcher,
}

impl ServiceMessageSink {
    pub fn new(log: Arc<dyn Log>, echo: Echo) -> Self {
        Self {
            scanner: ServiceMessageScanner::new(),
            dispatcher: ServiceMessageDispatcher::new(log, echo),
        }
    }

    fn feed(&mut self, source: OutputSource, line: &str) {
        let dispatcher = &mut self.dispatcher;
        let mut emit = |event: ScanEvent| dispatcher.handle(event);
        self.scanner.append(source, line, &mut emit);
        self.scanner.finish(&mut emit);
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    pub fn into_session(self) -> Session {
        self.dispatcher.into_session()
    }
}

impl OutputSink for ServiceMessageSink {
    fn write_info(&mut self, line: &str) {
        self.feed(OutputSource::StdOut, line);
    }

    fn write_error(&mut self, line: &str) {
        self.feed(OutputSource::StdErr, line);
    }
}
