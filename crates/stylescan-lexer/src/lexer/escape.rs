//! Serialization of names and strings back to CSS source.
//!
//! Every function here produces text that the tokenizer reads back to the
//! original value.

use std::fmt::Write;

/// Escape `value` so that it tokenizes as a single identifier with the same text.
///
/// Plain identifiers come back unchanged. A leading digit (or a digit right
/// after a leading `-`) and control characters are hex-escaped, a lone `-`
/// becomes `\-` and `--` becomes `-\-`. Other characters outside the name
/// alphabet get a backslash. An empty string has no identifier form and
/// yields `""`.
pub fn serialize_identifier(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let leading_dash = value.starts_with('-');

    if leading_dash {
        chars.next();
        if chars.peek().is_none() {
            return "\\-".to_owned();
        }
        // A bare `--` only reads as an identifier at the end of input.
        if value == "--" {
            return "-\\-".to_owned();
        }
        out.push('-');
    }

    let mut first = true;
    for c in chars {
        if is_control(c) || (first && c.is_ascii_digit()) {
            escape_code_point(c, &mut out);
        } else {
            push_name_char(c, &mut out);
        }
        first = false;
    }
    out
}

/// Escape `value` for use after `#`, where a name may start with any name
/// character including digits.
pub fn serialize_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if is_control(c) {
            escape_code_point(c, &mut out);
        } else {
            push_name_char(c, &mut out);
        }
    }
    out
}

/// Quote `value` as a double-quoted string literal.
pub fn serialize_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if is_control(c) => escape_code_point(c, &mut out),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Append `c` as a hex escape terminated by a space.
pub(crate) fn escape_code_point(c: char, out: &mut String) {
    // Writing to a String cannot fail.
    let _ = write!(out, "\\{:x} ", u32::from(c));
}

fn push_name_char(c: char, out: &mut String) {
    if c.is_ascii_alphanumeric() || c == '_' || c == '-' || u32::from(c) >= 160 {
        out.push(c);
    } else {
        out.push('\\');
        out.push(c);
    }
}

fn is_control(c: char) -> bool {
    matches!(c, '\0'..='\u{1f}' | '\u{7f}')
}
