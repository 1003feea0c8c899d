use std::fmt;

use serde::Serialize;
use watchless::document::{ColumnAlignment, Frame};
use watchless::timecode;

use crate::error::ViewerResult;
use crate::playback::{PlaybackController, PlayerOptions};

/// The interactive rendering of a note body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    pub nodes: Vec<RenderNode>,
    /// Every activatable anchor, indexed by control id in document order.
    pub controls: Vec<Control>,
}

/// A typed render instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    /// A node that renders as nothing (level-1 headings).
    Suppressed,
    Heading {
        level: u8,
        children: Vec<RenderNode>,
    },
    Paragraph {
        children: Vec<RenderNode>,
    },
    /// Inline content of a tight list item, rendered without a paragraph.
    Plain {
        children: Vec<RenderNode>,
    },
    Text {
        text: String,
    },
    /// A `[[Target]]` token, kept verbatim.
    WikiLink {
        text: String,
    },
    Strong {
        children: Vec<RenderNode>,
    },
    Emphasis {
        children: Vec<RenderNode>,
    },
    Strikethrough {
        children: Vec<RenderNode>,
    },
    Code {
        code: String,
    },
    HardBreak,
    /// A normal link; activating it navigates to `href`.
    Link {
        control: usize,
        href: String,
        title: String,
        children: Vec<RenderNode>,
    },
    /// A timestamp anchor; activating it seeks the player instead of navigating.
    SeekControl {
        control: usize,
        href: String,
        timestamp: String,
        children: Vec<RenderNode>,
    },
    Image {
        src: String,
        title: String,
        alt: String,
    },
    TableWrapper {
        scrollable: bool,
        bordered: bool,
        table: TableView,
    },
    VideoPlayer {
        video_id: String,
        options: PlayerOptions,
    },
    /// An embedded frame passed through unchanged.
    Frame {
        frame: Frame,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Blockquote {
        children: Vec<RenderNode>,
    },
    OrderedList {
        start: u64,
        items: Vec<Vec<RenderNode>>,
    },
    UnorderedList {
        items: Vec<Vec<RenderNode>>,
    },
    Html {
        html: String,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub alignments: Vec<ColumnAlignment>,
    pub headers: Vec<Vec<RenderNode>>,
    pub rows: Vec<Vec<Vec<RenderNode>>>,
}

/// An activatable anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub id: usize,
    pub href: String,
    pub action: ControlAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlAction {
    /// Seek to the anchor's timestamp text.
    Seek { timestamp: String },
    /// Follow the link target.
    Navigate,
}

/// What happened when a control was activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Playback was sent to `seconds`; default navigation is suppressed.
    Seek { seconds: u64 },
    /// Default navigation proceeds to `href`.
    Navigate { href: String },
}

impl Activation {
    pub fn suppresses_navigation(&self) -> bool {
        matches!(self, Activation::Seek { .. })
    }
}

impl Control {
    /// Run the control's action against the playback controller.
    pub fn activate(&self, controller: &mut PlaybackController) -> ViewerResult<Activation> {
        match &self.action {
            ControlAction::Seek { timestamp } => {
                let seconds = timecode::to_seconds(timestamp)?;
                controller.seek_and_play(seconds);
                Ok(Activation::Seek { seconds })
            }
            ControlAction::Navigate => Ok(Activation::Navigate {
                href: self.href.clone(),
            }),
        }
    }
}

impl RenderTree {
    pub fn control(&self, id: usize) -> Option<&Control> {
        self.controls.get(id)
    }

    pub fn seek_controls(&self) -> impl Iterator<Item = &Control> {
        self.controls
            .iter()
            .filter(|c| matches!(c.action, ControlAction::Seek { .. }))
    }

    /// Video ids of every player in the tree, in document order.
    pub fn video_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let RenderNode::VideoPlayer { video_id, .. } = node {
                ids.push(video_id.as_str());
            }
        });
        ids
    }

    /// Every `[[...]]` token, in document order.
    pub fn wiki_links(&self) -> Vec<&str> {
        let mut links = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let RenderNode::WikiLink { text } = node {
                links.push(text.as_str());
            }
        });
        links
    }
}

/// Pre-order visit of every node, table cells included.
fn walk<'a>(nodes: &'a [RenderNode], visit: &mut impl FnMut(&'a RenderNode)) {
    for node in nodes {
        visit(node);
        match node {
            RenderNode::Heading { children, .. }
            | RenderNode::Paragraph { children }
            | RenderNode::Plain { children }
            | RenderNode::Strong { children }
            | RenderNode::Emphasis { children }
            | RenderNode::Strikethrough { children }
            | RenderNode::Link { children, .. }
            | RenderNode::SeekControl { children, .. }
            | RenderNode::Blockquote { children } => walk(children, visit),
            RenderNode::OrderedList { items, .. } | RenderNode::UnorderedList { items } => {
                for item in items {
                    walk(item, visit);
                }
            }
            RenderNode::TableWrapper { table, .. } => {
                for cell in table.headers.iter().chain(table.rows.iter().flatten()) {
                    walk(cell, visit);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Outline display
// ---------------------------------------------------------------------------

impl fmt::Display for RenderTree {
    /// Indented outline, one render instruction per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes, 0)
    }
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[RenderNode], depth: usize) -> fmt::Result {
    for node in nodes {
        write_node(f, node, depth)?;
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &RenderNode, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match node {
        RenderNode::Suppressed => writeln!(f, "{pad}(suppressed)"),
        RenderNode::Heading { level, children } => {
            writeln!(f, "{pad}heading h{level}")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Paragraph { children } => {
            writeln!(f, "{pad}paragraph")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Plain { children } => {
            writeln!(f, "{pad}plain")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Text { text } => writeln!(f, "{pad}text {:?}", text),
        RenderNode::WikiLink { text } => writeln!(f, "{pad}wiki-link {:?}", text),
        RenderNode::Strong { children } => {
            writeln!(f, "{pad}strong")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Emphasis { children } => {
            writeln!(f, "{pad}emphasis")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Strikethrough { children } => {
            writeln!(f, "{pad}strikethrough")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Code { code } => writeln!(f, "{pad}code {:?}", code),
        RenderNode::HardBreak => writeln!(f, "{pad}break"),
        RenderNode::Link {
            control,
            href,
            children,
            ..
        } => {
            writeln!(f, "{pad}link #{control} -> {href}")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::SeekControl {
            control,
            timestamp,
            children,
            ..
        } => {
            writeln!(f, "{pad}seek #{control} @ {timestamp}")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::Image { src, alt, .. } => writeln!(f, "{pad}image {src} {:?}", alt),
        RenderNode::TableWrapper { table, .. } => {
            writeln!(f, "{pad}table (scrollable, bordered)")?;
            for (i, cell) in table.headers.iter().enumerate() {
                writeln!(f, "{pad}  header {i}")?;
                write_nodes(f, cell, depth + 2)?;
            }
            for (r, row) in table.rows.iter().enumerate() {
                writeln!(f, "{pad}  row {r}")?;
                for cell in row {
                    writeln!(f, "{pad}    cell")?;
                    write_nodes(f, cell, depth + 3)?;
                }
            }
            Ok(())
        }
        RenderNode::VideoPlayer { video_id, options } => writeln!(
            f,
            "{pad}video-player {video_id} ({}x{}{})",
            options.width,
            options.height,
            if options.autoplay { ", autoplay" } else { "" }
        ),
        RenderNode::Frame { frame } => writeln!(f, "{pad}frame {}", frame),
        RenderNode::CodeBlock { language, content } => writeln!(
            f,
            "{pad}code-block {} ({} lines)",
            language.as_deref().unwrap_or("-"),
            content.lines().count()
        ),
        RenderNode::Blockquote { children } => {
            writeln!(f, "{pad}blockquote")?;
            write_nodes(f, children, depth + 1)
        }
        RenderNode::OrderedList { start, items } => {
            writeln!(f, "{pad}ordered-list from {start}")?;
            for item in items {
                writeln!(f, "{pad}  item")?;
                write_nodes(f, item, depth + 2)?;
            }
            Ok(())
        }
        RenderNode::UnorderedList { items } => {
            writeln!(f, "{pad}list")?;
            for item in items {
                writeln!(f, "{pad}  item")?;
                write_nodes(f, item, depth + 2)?;
            }
            Ok(())
        }
        RenderNode::Html { html } => writeln!(f, "{pad}html {:?}", html.trim()),
        RenderNode::Rule => writeln!(f, "{pad}rule"),
    }
}
