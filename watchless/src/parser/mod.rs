pub(crate) mod html;
mod structural;

pub use structural::parse_document;

use tracing::debug;

use crate::Note;
use crate::frontmatter;

/// Parser entry point: splits off the front-matter, then parses the body.
pub struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { source }
    }

    /// Parse the source into a Note. Never fails: malformed front-matter
    /// leaves the whole source as the body.
    pub fn parse(&self) -> Note {
        let split = frontmatter::split(self.source);
        let body = parse_document(split.body);
        debug!(
            properties = split.properties.len(),
            nodes = body.nodes.len(),
            "parsed note"
        );
        Note {
            properties: split.properties,
            body,
            body_offset: split.body_offset,
        }
    }
}
