//! Lightweight tag lookup over E-utilities response bodies
//!
//! Responses are not validated against any DTD. Elements are matched by local
//! name, case-insensitively, and the reader tolerates mismatched end tags so
//! that partially broken bodies still yield whatever fields can be found.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Requested type of an extracted field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    List,
}

/// A field extracted from a response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParsedField {
    Text(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    /// Node text kept as-is because it could not be coerced to the requested kind
    Raw(String),
}

impl ParsedField {
    fn empty() -> Self {
        ParsedField::Text(String::new())
    }

    /// Field value rendered as text; lists are comma-joined
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParsedField::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParsedField::Float(value) => Some(*value),
            ParsedField::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            ParsedField::List(values) => values,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ParsedField::Text(text) | ParsedField::Raw(text) => text.is_empty(),
            ParsedField::List(values) => values.is_empty(),
            ParsedField::Int(_) | ParsedField::Float(_) => false,
        }
    }
}

impl fmt::Display for ParsedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedField::Text(text) | ParsedField::Raw(text) => f.write_str(text),
            ParsedField::Int(value) => write!(f, "{value}"),
            ParsedField::Float(value) => write!(f, "{value}"),
            ParsedField::List(values) => f.write_str(&values.join(",")),
        }
    }
}

impl PartialEq<&str> for ParsedField {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, ParsedField::Text(text) | ParsedField::Raw(text) if text == other)
    }
}

/// Collect the trimmed text content of every element named `name`
///
/// Text of nested elements is included. With `first` set, scanning stops at
/// the first complete match. Elements left open at end of input still count.
pub fn find_elements(text: &str, name: &str, first: bool) -> Vec<String> {
    collect(text, name, None, first)
}

/// Like [`find_elements`], restricted to `name` elements nested in `parent`
pub fn find_within(text: &str, parent: &str, name: &str) -> Vec<String> {
    collect(text, name, Some(parent), false)
}

fn collect(text: &str, name: &str, parent: Option<&str>, first: bool) -> Vec<String> {
    let wanted = name.as_bytes();
    let parent = parent.map(str::as_bytes);
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut found = Vec::new();
    // (depth, accumulated text) for every open matching element
    let mut open: Vec<(usize, String)> = Vec::new();
    let mut parents: Vec<usize> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                let in_scope = parent.is_none() || !parents.is_empty();
                if in_scope && local.as_ref().eq_ignore_ascii_case(wanted) {
                    open.push((depth, String::new()));
                }
                if parent.is_some_and(|p| local.as_ref().eq_ignore_ascii_case(p)) {
                    parents.push(depth);
                }
            }
            Ok(Event::Empty(e)) => {
                let in_scope = parent.is_none() || !parents.is_empty();
                if in_scope && e.local_name().as_ref().eq_ignore_ascii_case(wanted) {
                    found.push(String::new());
                    if first {
                        break;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if !open.is_empty() {
                    let chunk = e
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    for (_, buf) in open.iter_mut() {
                        buf.push_str(&chunk);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if !open.is_empty() {
                    let chunk = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    for (_, buf) in open.iter_mut() {
                        buf.push_str(&chunk);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if open.last().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, buf)) = open.pop() {
                        found.push(buf.trim().to_string());
                        if first {
                            break;
                        }
                    }
                }
                if parents.last() == Some(&depth) {
                    parents.pop();
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(
                    position = reader.buffer_position(),
                    "Stopping field lookup on malformed input: {}", err
                );
                break;
            }
        }
    }

    if !(first && !found.is_empty()) {
        // Unclosed elements at end of input
        found.extend(open.into_iter().map(|(_, buf)| buf.trim().to_string()));
    }

    if first {
        found.truncate(1);
    }
    found
}

/// Extract `name` from `text`, coerced to `kind`
///
/// Missing fields yield empty text. Int and Float values that fail to parse are
/// returned as [`ParsedField::Raw`].
pub fn extract_field(text: &str, name: &str, kind: FieldKind, first: bool) -> ParsedField {
    let values = find_elements(text, name, first && kind != FieldKind::List);

    if values.is_empty() {
        return ParsedField::empty();
    }

    match kind {
        FieldKind::List => ParsedField::List(values),
        FieldKind::Int => {
            let value = &values[0];
            value
                .parse::<i64>()
                .map(ParsedField::Int)
                .unwrap_or_else(|_| ParsedField::Raw(value.clone()))
        }
        FieldKind::Float => {
            let value = &values[0];
            value
                .parse::<f64>()
                .map(ParsedField::Float)
                .unwrap_or_else(|_| ParsedField::Raw(value.clone()))
        }
        FieldKind::Text => ParsedField::Text(values[0].clone()),
    }
}

/// First occurrence of `name` as text, or `None` when missing or empty
pub(crate) fn first_text(text: &str, name: &str) -> Option<String> {
    find_elements(text, name, true)
        .into_iter()
        .next()
        .filter(|s| !s.is_empty())
}
