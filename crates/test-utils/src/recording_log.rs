use std::sync::Mutex;

use stagehand::log::{Log, LogLevel, SensitiveValues};

/// A [`Log`] that remembers everything written to it.
///
/// Lines are masked the same way the production log masks them, so tests
/// can check that sensitive values never come out.
#[derive(Debug, Default)]
pub struct RecordingLog {
    sensitive: SensitiveValues,
    lines: Mutex<Vec<(LogLevel, String)>>,
    progress: Mutex<Vec<(i32, Option<String>)>>,
    masked: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }

    /// Text written at `level`, in order.
    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn progress(&self) -> Vec<(i32, Option<String>)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn masked_values(&self) -> Vec<String> {
        self.masked.lock().unwrap().clone()
    }
}

impl Log for RecordingLog {
    fn write(&self, level: LogLevel, message: &str) {
        let masked = self.sensitive.mask(message);
        self.lines.lock().unwrap().push((level, masked));
    }

    fn mask_sensitive(&self, value: &str) {
        self.sensitive.add(value);
        self.masked.lock().unwrap().push(value.to_string());
    }

    fn progress(&self, percentage: i32, message: Option<&str>) {
        self.progress
            .lock()
            .unwrap()
            .push((percentage, message.map(str::to_string)));
    }
}
