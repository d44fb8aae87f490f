// src/messages/scanner.rs

//! Character-level scanner that separates plain text from service messages.
//!
//! States:
//! - `Default`: text accumulates; `\r` is dropped, `\n` flushes a line, and
//!   `#` may start the `##octopus` marker.
//! - `PossibleMessage`: the tail of the buffer is a proper prefix of the
//!   marker. Completing the marker flushes any text before it and enters
//!   `InMessage`.
//! - `InMessage`: everything up to `]` is the message body.
//!
//! The scanner never fails. A body that does not decode is reported as a
//! [`ScanEvent::Message`] carrying a [`MalformedMessage`] so the consumer
//! decides how to surface it.

use std::mem;

use super::model::{MESSAGE_MARKER, MessageParseError, ServiceMessage, clean_body};

/// Which stream a piece of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputSource {
    StdOut,
    StdErr,
}

/// A message body that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedMessage {
    /// The body with its `[` and line breaks removed.
    pub body: String,
    pub error: MessageParseError,
}

impl MalformedMessage {
    /// The line written in place of the message.
    pub fn describe(&self) -> String {
        format!("Could not parse '{MESSAGE_MARKER}[{}]'", self.body)
    }
}

/// Output of the scanner, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Text {
        source: OutputSource,
        text: String,
    },
    Message {
        source: OutputSource,
        message: Result<ServiceMessage, MalformedMessage>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    PossibleMessage,
    InMessage,
}

#[derive(Debug)]
pub struct ServiceMessageScanner {
    state: State,
    buffer: String,
    /// Byte offset in `buffer` where the candidate marker starts.
    marker_start: usize,
    last_source: Option<OutputSource>,
}

impl Default for ServiceMessageScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMessageScanner {
    pub fn new() -> Self {
        Self {
            state: State::Default,
            buffer: String::new(),
            marker_start: 0,
            last_source: None,
        }
    }

    /// Scan `text` from `source`. Switching source flushes whatever is
    /// buffered for the previous one first.
    pub fn append<F>(&mut self, source: OutputSource, text: &str, emit: &mut F)
    where
        F: FnMut(ScanEvent),
    {
        if self.last_source.is_some_and(|last| last != source) {
            self.finish(emit);
        }
        self.last_source = Some(source);

        for c in text.chars() {
            self.push(c, source, emit);
        }
    }

    /// Flush anything still buffered as plain text and return to `Default`.
    ///
    /// An unterminated message gets its marker back so no input is lost.
    /// Calling this again without new input emits nothing.
    pub fn finish<F>(&mut self, emit: &mut F)
    where
        F: FnMut(ScanEvent),
    {
        if self.state == State::InMessage {
            self.buffer.insert_str(0, MESSAGE_MARKER);
        }
        self.state = State::Default;
        self.marker_start = 0;

        let source = self.last_source.unwrap_or(OutputSource::StdOut);
        self.flush_text(source, emit);
    }

    fn push<F>(&mut self, c: char, source: OutputSource, emit: &mut F)
    where
        F: FnMut(ScanEvent),
    {
        match self.state {
            State::Default => self.push_default(c, source, emit),
            State::PossibleMessage => {
                if c == '\r' || c == '\n' {
                    self.state = State::Default;
                    self.push_default(c, source, emit);
                    return;
                }

                self.buffer.push(c);
                let candidate = &self.buffer[self.marker_start..];
                if candidate == MESSAGE_MARKER {
                    self.buffer.truncate(self.marker_start);
                    self.flush_text(source, emit);
                    self.state = State::InMessage;
                } else if !MESSAGE_MARKER.starts_with(candidate) {
                    match self.next_marker_start() {
                        Some(start) => self.marker_start = start,
                        None => self.state = State::Default,
                    }
                }
            }
            State::InMessage => {
                if c == ']' {
                    let body = mem::take(&mut self.buffer);
                    self.state = State::Default;
                    emit(ScanEvent::Message {
                        source,
                        message: decode(&body),
                    });
                } else {
                    self.buffer.push(c);
                }
            }
        }
    }

    fn push_default<F>(&mut self, c: char, source: OutputSource, emit: &mut F)
    where
        F: FnMut(ScanEvent),
    {
        match c {
            '\r' => {}
            '\n' => self.flush_text(source, emit),
            '#' => {
                self.marker_start = self.buffer.len();
                self.buffer.push(c);
                self.state = State::PossibleMessage;
            }
            other => self.buffer.push(other),
        }
    }

    /// A later `#` inside a failed candidate may still begin the marker,
    /// e.g. the second `#` of `###octopus`.
    fn next_marker_start(&self) -> Option<usize> {
        let candidate = &self.buffer[self.marker_start..];
        candidate
            .char_indices()
            .skip(1)
            .filter(|(_, c)| *c == '#')
            .map(|(offset, _)| self.marker_start + offset)
            .find(|&start| MESSAGE_MARKER.starts_with(&self.buffer[start..]))
    }

    fn flush_text<F>(&mut self, source: OutputSource, emit: &mut F)
    where
        F: FnMut(ScanEvent),
    {
        if self.buffer.is_empty() {
            return;
        }
        let text = mem::take(&mut self.buffer);
        emit(ScanEvent::Text { source, text });
    }
}

fn decode(body: &str) -> Result<ServiceMessage, MalformedMessage> {
    ServiceMessage::parse_body(body).map_err(|error| MalformedMessage {
        body: clean_body(body),
        error,
    })
}
