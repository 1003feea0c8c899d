use std::ops::Range;

use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd,
};

use crate::document::{Anchor, ColumnAlignment, Document, DocumentNode, InlineNode};
use crate::parser::html::{self, HtmlPiece};

type Events<'a> = [(Event<'a>, Range<usize>)];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse Markdown body text into a Document.
///
/// GitHub-flavored tables and strikethrough are enabled. Raw HTML is kept,
/// with `<iframe>` elements lifted into frame nodes.
pub fn parse_document(source: &str) -> Document {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut i = 0;
    let nodes = collect_blocks(&events, &mut i, &|_| false);
    Document { nodes }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Collect block nodes until a matching End tag (or the end of the stream).
fn collect_blocks(
    events: &Events<'_>,
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> Vec<DocumentNode> {
    let mut nodes = Vec::new();

    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }

            Event::Start(Tag::Heading { level, .. }) => {
                let level = heading_level_to_u8(level);
                *i += 1;
                let content = collect_inlines(events, i, &|e| matches!(e, TagEnd::Heading(_)));
                nodes.push(DocumentNode::Heading { level, content });
            }

            Event::Start(Tag::Paragraph) => {
                *i += 1;
                let mut content = collect_inlines(events, i, &|e| matches!(e, TagEnd::Paragraph));
                // `<iframe ...></iframe>` on one line is not an HTML block in
                // CommonMark; a paragraph holding nothing else is a block frame.
                if matches!(content.as_slice(), [InlineNode::Frame(_)]) {
                    if let Some(InlineNode::Frame(frame)) = content.pop() {
                        nodes.push(DocumentNode::Frame { frame });
                    }
                } else {
                    nodes.push(DocumentNode::Paragraph { content });
                }
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        let lang = lang.to_string();
                        if lang.is_empty() { None } else { Some(lang) }
                    }
                    CodeBlockKind::Indented => None,
                };
                *i += 1;
                let content = collect_text_until(events, i, |e| matches!(e, TagEnd::CodeBlock));
                nodes.push(DocumentNode::CodeBlock { language, content });
            }

            Event::Start(Tag::Table(alignments)) => {
                let alignments = alignments.iter().map(column_alignment).collect();
                *i += 1;
                let (headers, rows) = collect_table(events, i);
                nodes.push(DocumentNode::Table {
                    alignments,
                    headers,
                    rows,
                });
            }

            Event::Start(Tag::BlockQuote(_)) => {
                *i += 1;
                let inner = collect_blocks(events, i, &|e| matches!(e, TagEnd::BlockQuote(_)));
                nodes.push(DocumentNode::Blockquote {
                    document: Document { nodes: inner },
                });
            }

            Event::Start(Tag::List(start)) => {
                let start = *start;
                *i += 1;
                let items = collect_list_items(events, i);
                nodes.push(match start {
                    Some(start) => DocumentNode::OrderedList { start, items },
                    None => DocumentNode::UnorderedList { items },
                });
            }

            Event::Start(Tag::HtmlBlock) => {
                *i += 1;
                let raw = collect_text_until(events, i, |e| matches!(e, TagEnd::HtmlBlock));
                for piece in html::scan(&raw) {
                    nodes.push(match piece {
                        HtmlPiece::Frame(frame) => DocumentNode::Frame { frame },
                        HtmlPiece::Raw(html) => DocumentNode::Html { html },
                    });
                }
            }

            Event::Rule => {
                nodes.push(DocumentNode::HorizontalRule);
                *i += 1;
            }

            // Inline content directly inside a container, e.g. a tight list item
            _ => {
                let content = collect_inline_run(events, i);
                if content.is_empty() {
                    *i += 1;
                } else {
                    nodes.push(DocumentNode::Plain { content });
                }
            }
        }
    }

    nodes
}

/// Collect the items of a list until its End tag.
fn collect_list_items(events: &Events<'_>, i: &mut usize) -> Vec<Document> {
    let mut items = Vec::new();

    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(TagEnd::List(_)) => {
                *i += 1;
                break;
            }
            Event::Start(Tag::Item) => {
                *i += 1;
                let nodes = collect_blocks(events, i, &|e| matches!(e, TagEnd::Item));
                items.push(Document { nodes });
            }
            _ => {
                *i += 1;
            }
        }
    }

    items
}

/// Collect table headers and rows.
fn collect_table(
    events: &Events<'_>,
    i: &mut usize,
) -> (Vec<Vec<InlineNode>>, Vec<Vec<Vec<InlineNode>>>) {
    let mut headers: Vec<Vec<InlineNode>> = Vec::new();
    let mut rows: Vec<Vec<Vec<InlineNode>>> = Vec::new();
    let mut in_head = false;
    let mut current_row: Vec<Vec<InlineNode>> = Vec::new();

    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(TagEnd::Table) => {
                *i += 1;
                break;
            }
            Event::Start(Tag::TableHead) => {
                in_head = true;
                *i += 1;
            }
            Event::End(TagEnd::TableHead) => {
                in_head = false;
                headers = std::mem::take(&mut current_row);
                *i += 1;
            }
            Event::Start(Tag::TableRow) => {
                current_row = Vec::new();
                *i += 1;
            }
            Event::End(TagEnd::TableRow) => {
                if !in_head {
                    rows.push(std::mem::take(&mut current_row));
                }
                *i += 1;
            }
            Event::Start(Tag::TableCell) => {
                *i += 1;
                let cell = collect_inlines(events, i, &|e| matches!(e, TagEnd::TableCell));
                current_row.push(cell);
            }
            _ => {
                *i += 1;
            }
        }
    }

    (headers, rows)
}

// ---------------------------------------------------------------------------
// Inlines
// ---------------------------------------------------------------------------

enum InlineStep {
    Node(InlineNode),
    /// Consumed without producing a node (an `</iframe>` closing tag).
    Skipped,
    /// The event at the cursor is not inline content.
    NotInline,
}

/// Collect inline nodes until a matching End tag.
fn collect_inlines(
    events: &Events<'_>,
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> Vec<InlineNode> {
    let mut inlines = Vec::new();

    while *i < events.len() {
        if let Event::End(tag_end) = &events[*i].0 {
            if is_end(tag_end) {
                *i += 1;
                break;
            }
        }
        match inline_step(events, i) {
            InlineStep::Node(node) => push_inline(&mut inlines, node),
            InlineStep::Skipped => {}
            InlineStep::NotInline => *i += 1,
        }
    }

    inlines
}

/// Collect consecutive inline nodes, stopping before the first block event.
fn collect_inline_run(events: &Events<'_>, i: &mut usize) -> Vec<InlineNode> {
    let mut inlines = Vec::new();

    while *i < events.len() {
        match inline_step(events, i) {
            InlineStep::Node(node) => push_inline(&mut inlines, node),
            InlineStep::Skipped => {}
            InlineStep::NotInline => break,
        }
    }

    inlines
}

/// Parse the inline element at the cursor, advancing past it.
fn inline_step(events: &Events<'_>, i: &mut usize) -> InlineStep {
    let (ref ev, ref range) = events[*i];
    let node = match ev {
        Event::Text(s) => InlineNode::Text(s.to_string()),
        Event::Code(s) => InlineNode::CodeSpan(s.to_string()),
        Event::SoftBreak => InlineNode::Text("\n".to_string()),
        Event::HardBreak => InlineNode::HardBreak,
        Event::InlineHtml(s) | Event::Html(s) => {
            *i += 1;
            if html::is_frame_close(s) {
                return InlineStep::Skipped;
            }
            let mut pieces = html::scan(s);
            return InlineStep::Node(match (pieces.len(), pieces.pop()) {
                (1, Some(HtmlPiece::Frame(frame))) => InlineNode::Frame(frame),
                _ => InlineNode::Html(s.to_string()),
            });
        }
        Event::Start(Tag::Strong) => {
            *i += 1;
            let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Strong));
            return InlineStep::Node(InlineNode::Strong(children));
        }
        Event::Start(Tag::Emphasis) => {
            *i += 1;
            let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Emphasis));
            return InlineStep::Node(InlineNode::Emphasis(children));
        }
        Event::Start(Tag::Strikethrough) => {
            *i += 1;
            let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Strikethrough));
            return InlineStep::Node(InlineNode::Strikethrough(children));
        }
        Event::Start(Tag::Link { dest_url, title, .. }) => {
            let dest = dest_url.to_string();
            let title = title.to_string();
            let span = range.clone();
            *i += 1;
            let content = collect_inlines(events, i, &|e| matches!(e, TagEnd::Link));
            return InlineStep::Node(InlineNode::Link(Anchor {
                dest,
                title,
                content,
                span,
            }));
        }
        Event::Start(Tag::Image { dest_url, title, .. }) => {
            let dest = dest_url.to_string();
            let title = title.to_string();
            *i += 1;
            let alt = collect_inlines(events, i, &|e| matches!(e, TagEnd::Image));
            return InlineStep::Node(InlineNode::Image { dest, title, alt });
        }
        _ => return InlineStep::NotInline,
    };
    *i += 1;
    InlineStep::Node(node)
}

/// Append an inline node, merging adjacent text runs.
fn push_inline(inlines: &mut Vec<InlineNode>, node: InlineNode) {
    if let InlineNode::Text(text) = &node {
        if let Some(InlineNode::Text(last)) = inlines.last_mut() {
            last.push_str(text);
            return;
        }
    }
    inlines.push(node);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn column_alignment(alignment: &Alignment) -> ColumnAlignment {
    match alignment {
        Alignment::None => ColumnAlignment::None,
        Alignment::Left => ColumnAlignment::Left,
        Alignment::Center => ColumnAlignment::Center,
        Alignment::Right => ColumnAlignment::Right,
    }
}

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &Events<'_>,
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) | Event::Html(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}
