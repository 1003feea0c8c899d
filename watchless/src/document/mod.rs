use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A parsed note body: the sequence of block nodes that follows the front-matter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub nodes: Vec<DocumentNode>,
}

/// A single block-level node of the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentNode {
    Paragraph {
        content: Vec<InlineNode>,
    },
    /// Inline content placed directly in a tight list item, without a
    /// paragraph around it.
    Plain {
        content: Vec<InlineNode>,
    },
    Heading {
        level: u8,
        content: Vec<InlineNode>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Blockquote {
        document: Document,
    },
    Table {
        alignments: Vec<ColumnAlignment>,
        headers: Vec<Vec<InlineNode>>,
        rows: Vec<Vec<Vec<InlineNode>>>,
    },
    OrderedList {
        start: u64,
        items: Vec<Document>,
    },
    UnorderedList {
        items: Vec<Document>,
    },
    /// An `<iframe>` found in a raw HTML block.
    Frame {
        frame: Frame,
    },
    /// Any other raw HTML block, kept verbatim.
    Html {
        html: String,
    },
    HorizontalRule,
}

/// Inline elements that appear within a line of text.
///
/// Adjacent text runs, soft line breaks included, are merged into one `Text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InlineNode {
    Text(String),
    Strong(Vec<InlineNode>),
    Emphasis(Vec<InlineNode>),
    Strikethrough(Vec<InlineNode>),
    CodeSpan(String),
    Link(Anchor),
    Image {
        dest: String,
        title: String,
        alt: Vec<InlineNode>,
    },
    Frame(Frame),
    Html(String),
    HardBreak,
}

/// A link with its destination and nested content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub dest: String,
    pub title: String,
    pub content: Vec<InlineNode>,
    /// Byte span of the link in the parsed body.
    #[serde(skip)]
    pub span: Range<usize>,
}

/// An embedded frame with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub src: Option<String>,
    pub attributes: Vec<(String, String)>,
}

impl Frame {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAlignment {
    None,
    Left,
    Center,
    Right,
}

/// Concatenate the visible text of `nodes`, descending into every container.
///
/// Base case: `Text` and `CodeSpan` contribute their string. Containers
/// contribute their children in order. Breaks contribute a newline. Images,
/// frames and raw HTML have no text children and contribute nothing.
pub fn flatten_text(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    flatten_into(nodes, &mut out);
    out
}

fn flatten_into(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text(s) | InlineNode::CodeSpan(s) => out.push_str(s),
            InlineNode::Strong(children)
            | InlineNode::Emphasis(children)
            | InlineNode::Strikethrough(children) => flatten_into(children, out),
            InlineNode::Link(anchor) => flatten_into(&anchor.content, out),
            InlineNode::HardBreak => out.push('\n'),
            InlineNode::Image { .. } | InlineNode::Frame(_) | InlineNode::Html(_) => {}
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<iframe")?;
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, value)?;
        }
        write!(f, "></iframe>")
    }
}
