// src/cmdline/escape.rs

//! Argument quoting for native processes.
//!
//! Every value is wrapped in double quotes. Backslashes are doubled only
//! when they run into an embedded double quote or the end of the value, and
//! embedded double quotes are escaped with a backslash. This is the rule the
//! Microsoft C runtime uses to split a command line, so [`split_arguments`]
//! recovers the original values on every platform.

use std::iter::repeat_n;

/// Quote a single argument value.
pub fn escape_argument(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');

    let mut backslashes = 0usize;
    for c in value.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                escaped.extend(repeat_n('\\', backslashes * 2));
                escaped.push_str("\\\"");
                backslashes = 0;
            }
            other => {
                escaped.extend(repeat_n('\\', backslashes));
                escaped.push(other);
                backslashes = 0;
            }
        }
    }
    escaped.extend(repeat_n('\\', backslashes * 2));

    escaped.push('"');
    escaped
}

/// Split an argument string into individual arguments.
///
/// Tokens are separated by unquoted spaces or tabs. `2n` backslashes
/// followed by a quote yield `n` backslashes and toggle quoting; `2n + 1`
/// backslashes followed by a quote yield `n` backslashes and a literal
/// quote. Backslashes anywhere else are literal.
pub fn split_arguments(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut backslashes = 0usize;

    for c in line.chars() {
        match c {
            '\\' => {
                backslashes += 1;
                in_token = true;
            }
            '"' => {
                current.extend(repeat_n('\\', backslashes / 2));
                if backslashes % 2 == 1 {
                    current.push('"');
                } else {
                    in_quotes = !in_quotes;
                }
                backslashes = 0;
                in_token = true;
            }
            ' ' | '\t' if !in_quotes => {
                current.extend(repeat_n('\\', backslashes));
                backslashes = 0;
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            other => {
                current.extend(repeat_n('\\', backslashes));
                backslashes = 0;
                current.push(other);
                in_token = true;
            }
        }
    }

    current.extend(repeat_n('\\', backslashes));
    if in_token {
        args.push(current);
    }

    args
}
