//! Front-matter splitting and decoding.
//!
//! The block is a restricted YAML-like convention, not YAML: one `key: value`
//! pair per line, values are either scalars or bracketed lists.

mod value;

use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::debug;

pub use value::{DecodeStrategy, decode_value, decode_value_with_strategy};

const DELIMITER: &str = "---";

/// A decoded property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(String),
    List(Vec<String>),
}

impl fmt::Display for PropertyValue {
    /// Writes the value back in front-matter syntax. Scalars are always
    /// quoted so a value like `[[Note]]` does not decode as a list.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Scalar(s) => write!(f, "\"{}\"", s),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\"", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Ordered key/value mapping decoded from a front-matter block.
///
/// Insertion order is declaration order. Inserting an existing key replaces
/// its value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize back into a delimited front-matter block.
    pub fn to_front_matter(&self) -> String {
        let mut out = String::from(DELIMITER);
        out.push('\n');
        for (key, value) in &self.entries {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out
    }
}

/// The result of splitting a document into its properties and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub properties: PropertyMap,
    pub body: &'a str,
    /// Byte offset of `body` within the original text.
    pub body_offset: usize,
}

/// Location of a delimited front-matter block within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// Block content between the two delimiter lines.
    pub content: &'a str,
    /// Byte offset of `content` in the document.
    pub content_offset: usize,
    /// Byte offset where the body starts (leading whitespace skipped).
    pub body_offset: usize,
}

/// Locate the leading `---` ... `---` block, if there is a well-formed one.
pub fn locate(text: &str) -> Option<Block<'_>> {
    let first_line_end = text.find('\n')?;
    if text[..first_line_end].trim_end() != DELIMITER {
        return None;
    }

    let content_offset = first_line_end + 1;
    let mut pos = content_offset;
    while pos <= text.len() {
        let rest = &text[pos..];
        let line_len = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_len];
        if line.trim_end() == DELIMITER {
            let after = (pos + line_len + 1).min(text.len());
            let body_start = after + (text[after..].len() - text[after..].trim_start().len());
            return Some(Block {
                content: &text[content_offset..pos],
                content_offset,
                body_offset: body_start,
            });
        }
        if line_len == rest.len() {
            break;
        }
        pos += line_len + 1;
    }
    None
}

/// Split `text` into decoded properties and the body.
///
/// Missing or malformed front-matter is not an error: the whole text becomes
/// the body and the property map is empty.
pub fn split(text: &str) -> Split<'_> {
    let Some(block) = locate(text) else {
        return Split {
            properties: PropertyMap::new(),
            body: text,
            body_offset: 0,
        };
    };

    let properties = decode_block(block.content);
    debug!(count = properties.len(), "decoded front-matter properties");
    Split {
        properties,
        body: &text[block.body_offset..],
        body_offset: block.body_offset,
    }
}

/// A single `key: value` line of a block, before value decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry<'a> {
    pub key: &'a str,
    pub raw_value: &'a str,
    /// Byte range of `raw_value` within the block content.
    pub value_span: Range<usize>,
}

/// Split block content into raw entries.
///
/// Each line is cut at its first `:`; everything after it stays together so
/// values like URLs keep their own colons.
pub fn entries(block: &str) -> Vec<RawEntry<'_>> {
    let mut out = Vec::new();
    let mut offset = 0;
    for line in block.split('\n') {
        let line_offset = offset;
        offset += line.len() + 1;
        let Some((raw_key, rest)) = line.split_once(':') else {
            continue;
        };
        let key = raw_key.trim();
        if key.is_empty() {
            continue;
        }
        let raw_value = rest.trim();
        let value_start = line_offset + raw_key.len() + 1 + (rest.len() - rest.trim_start().len());
        out.push(RawEntry {
            key,
            raw_value,
            value_span: value_start..value_start + raw_value.len(),
        });
    }
    out
}

fn decode_block(block: &str) -> PropertyMap {
    let mut properties = PropertyMap::new();
    for entry in entries(block) {
        properties.insert(entry.key, decode_value(entry.raw_value));
    }
    properties
}
