pub mod document;
pub mod fetch;
pub mod frontmatter;
pub mod lint;
pub mod parser;
pub mod timecode;
pub mod video;

use crate::document::Document;
use crate::frontmatter::PropertyMap;

/// A parsed note: decoded front-matter properties plus the Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub properties: PropertyMap,
    pub body: Document,
    /// Byte offset of the body within the source text (for diagnostics).
    pub body_offset: usize,
}

impl Note {
    pub fn parse(source: &str) -> Self {
        parser::Parser::new(source).parse()
    }
}
