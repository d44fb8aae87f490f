// src/messages/model.rs

//! The [`ServiceMessage`] value and its wire form.
//!
//! On the wire a message looks like
//! `##octopus[name attr1="base64" attr2="base64"]`: the bracketed body is a
//! self-closed XML element with its `<` and `/>` left out, and every
//! attribute value is the Base64 encoding of its UTF-8 text.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use thiserror::Error;

/// Literal that introduces a service message on an output stream.
pub const MESSAGE_MARKER: &str = "##octopus";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("message body is empty")]
    Empty,

    #[error("malformed message element at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("attribute '{0}' appears more than once")]
    DuplicateAttribute(String),

    #[error("attribute '{attribute}' is not valid base64: {reason}")]
    InvalidBase64 { attribute: String, reason: String },
}

/// A decoded service message: a name plus attributes whose keys are unique
/// ignoring ASCII case. Attribute order is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    name: String,
    attributes: IndexMap<String, String>,
}

impl ServiceMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style attribute setter. A key that matches an existing one
    /// ignoring case replaces its value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position_of(&key) {
            Some(index) => {
                if let Some((_, existing)) = self.attributes.get_index_mut(index) {
                    *existing = value;
                }
            }
            None => {
                self.attributes.insert(key, value);
            }
        }
    }

    fn try_insert(&mut self, key: String, value: String) -> Result<(), MessageParseError> {
        if self.position_of(&key).is_some() {
            return Err(MessageParseError::DuplicateAttribute(key));
        }
        self.attributes.insert(key, value);
        Ok(())
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.attributes
            .keys()
            .position(|existing| existing.eq_ignore_ascii_case(key))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive attribute lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position_of(key)
            .and_then(|index| self.attributes.get_index(index))
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Decode a message body as captured between `##octopus` and `]`.
    pub fn parse_body(body: &str) -> Result<Self, MessageParseError> {
        let cleaned = clean_body(body);
        let (name, raw_attributes) = parse_element(&cleaned)?;

        let mut message = ServiceMessage::new(name);
        for (key, encoded) in raw_attributes {
            let bytes = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| MessageParseError::InvalidBase64 {
                    attribute: key.clone(),
                    reason: e.to_string(),
                })?;
            let value = String::from_utf8_lossy(&bytes).into_owned();
            message.try_insert(key, value)?;
        }

        Ok(message)
    }
}

impl fmt::Display for ServiceMessage {
    /// Wire form, e.g. `##octopus[setVariable name="VGVzdA=="]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MESSAGE_MARKER}[{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, STANDARD.encode(value.as_bytes()))?;
        }
        f.write_str("]")
    }
}

/// Trim a captured body, drop its opening `[` and any line breaks.
pub fn clean_body(body: &str) -> String {
    body.trim()
        .trim_start_matches('[')
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect()
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
        self.pos > start
    }

    fn take_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            self.bump();
        }
        Some(&self.text[start..self.pos])
    }

    fn malformed(&self, reason: &'static str) -> MessageParseError {
        MessageParseError::Malformed {
            offset: self.pos,
            reason,
        }
    }
}

type RawElement = (String, Vec<(String, String)>);

/// Parse `name key="value" key2='value2'` (the inside of `<.../>`).
fn parse_element(text: &str) -> Result<RawElement, MessageParseError> {
    if text.is_empty() {
        return Err(MessageParseError::Empty);
    }

    let mut cursor = Cursor { text, pos: 0 };
    let name = cursor
        .take_name()
        .ok_or_else(|| cursor.malformed("expected element name"))?
        .to_string();

    let mut attributes = Vec::new();
    loop {
        let separated = cursor.skip_whitespace();
        if cursor.peek().is_none() {
            break;
        }
        if !separated {
            return Err(cursor.malformed("expected whitespace before attribute"));
        }

        let key = cursor
            .take_name()
            .ok_or_else(|| cursor.malformed("expected attribute name"))?
            .to_string();
        cursor.skip_whitespace();
        if cursor.bump() != Some('=') {
            return Err(cursor.malformed("expected '=' after attribute name"));
        }
        cursor.skip_whitespace();

        let quote = match cursor.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(cursor.malformed("expected quoted attribute value")),
        };
        let start = cursor.pos;
        loop {
            match cursor.bump() {
                Some(c) if c == quote => break,
                Some('<') => return Err(cursor.malformed("'<' is not allowed in attribute values")),
                Some(_) => {}
                None => return Err(cursor.malformed("unterminated attribute value")),
            }
        }
        let raw = &text[start..cursor.pos - quote.len_utf8()];
        let value = decode_entities(raw).ok_or_else(|| cursor.malformed("invalid entity reference"))?;

        attributes.push((key, value));
    }

    Ok((name, attributes))
}

fn decode_entities(raw: &str) -> Option<String> {
    if !raw.contains('&') {
        return Some(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';')?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()?
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()?
                } else {
                    return None;
                };
                char::from_u32(code)?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Some(out)
}
