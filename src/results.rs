//! Presentation wrapper around raw E-utilities responses
//!
//! [`EResults`] keeps a response body either as-is or as a small XML tree that
//! pretty-prints with two-space indentation. Tree construction first tries a
//! strict reader, then a lenient one that tolerates unbalanced end tags and
//! closes elements left open at end of input, and finally keeps the raw text.

use std::fmt;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How [`EResults`] holds the response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    /// Raw text, printed unchanged
    #[default]
    Native,
    /// Parsed element tree, pretty-printed
    Tree,
}

/// One element of a parsed response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Trimmed text directly inside this element
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(e: &BytesStart<'_>) -> Self {
        let attributes = e
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, chunk: &str) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(chunk);
    }

    /// First descendant (or self) named `name`, case-insensitively
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name.eq_ignore_ascii_case(name) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Every descendant (or self) named `name`, in document order
    ///
    /// Matches are not searched for inside other matches.
    pub fn find_all(&self, name: &str) -> Vec<&XmlNode> {
        if self.name.eq_ignore_ascii_case(name) {
            return vec![self];
        }
        self.children
            .iter()
            .flat_map(|child| child.find_all(name))
            .collect()
    }

    fn write_pretty(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{}\"", escape(value.as_str()))?;
        }

        match (self.text.is_empty(), self.children.is_empty()) {
            (true, true) => writeln!(f, "/>"),
            (false, true) => writeln!(f, ">{}</{}>", escape(self.text.as_str()), self.name),
            _ => {
                writeln!(f, ">")?;
                if !self.text.is_empty() {
                    writeln!(f, "{indent}  {}", escape(self.text.as_str()))?;
                }
                for child in &self.children {
                    child.write_pretty(f, depth + 1)?;
                }
                writeln!(f, "{indent}</{}>", self.name)
            }
        }
    }
}

/// A response body ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EResults {
    raw: String,
    format: ResultFormat,
    tree: Option<Vec<XmlNode>>,
}

impl EResults {
    /// Wrap `text`; [`ResultFormat::Tree`] parses it, keeping the raw text on failure
    pub fn new(text: impl Into<String>, format: ResultFormat) -> Self {
        let raw = text.into();
        let tree = match format {
            ResultFormat::Native => None,
            ResultFormat::Tree => build_tree(&raw),
        };
        Self { raw, format, tree }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Requested format
    pub fn format(&self) -> ResultFormat {
        self.format
    }

    /// Parsed top-level elements, when a tree could be built
    pub fn tree(&self) -> Option<&[XmlNode]> {
        self.tree.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

impl fmt::Display for EResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tree {
            Some(roots) => {
                for root in roots {
                    root.write_pretty(f, 0)?;
                }
                Ok(())
            }
            None => f.write_str(&self.raw),
        }
    }
}

fn build_tree(text: &str) -> Option<Vec<XmlNode>> {
    if text.trim().is_empty() {
        return None;
    }

    match parse_tree(text, true) {
        Ok(roots) => Some(roots),
        Err(strict_err) => {
            debug!("Strict XML parse failed, retrying leniently: {}", strict_err);
            match parse_tree(text, false) {
                Ok(roots) => Some(roots),
                Err(lenient_err) => {
                    debug!("Lenient XML parse failed, keeping raw text: {}", lenient_err);
                    None
                }
            }
        }
    }
}

/// Build the element tree of `text`
///
/// In strict mode any mismatched or missing end tag is an error. Otherwise an
/// end tag closes the nearest open element of that name (and everything opened
/// after it), unmatched end tags are ignored and open elements are closed at
/// end of input.
fn parse_tree(text: &str, strict: bool) -> Result<Vec<XmlNode>, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = strict;
    reader.config_mut().allow_unmatched_ends = !strict;

    let mut roots: Vec<XmlNode> = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();

    fn close(stack: &mut Vec<XmlNode>, roots: &mut Vec<XmlNode>) {
        if let Some(node) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            }
        }
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(XmlNode::from_start(&e)),
            Ok(Event::Empty(e)) => {
                stack.push(XmlNode::from_start(&e));
                close(&mut stack, &mut roots);
            }
            Ok(Event::Text(e)) => {
                if let Some(node) = stack.last_mut() {
                    let chunk = e
                        .unescape()
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    node.push_text(&chunk);
                } else if strict && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err("text outside of the root element".to_string());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(node) = stack.last_mut() {
                    node.push_text(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if strict {
                    close(&mut stack, &mut roots);
                } else if let Some(pos) = stack.iter().rposition(|n| n.name.eq_ignore_ascii_case(&name)) {
                    while stack.len() > pos {
                        close(&mut stack, &mut roots);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    err
                ));
            }
        }
    }

    if !stack.is_empty() {
        if strict {
            return Err(format!("{} element(s) left open", stack.len()));
        }
        while !stack.is_empty() {
            close(&mut stack, &mut roots);
        }
    }

    if roots.is_empty() {
        return Err("no elements found".to_string());
    }
    Ok(roots)
}
