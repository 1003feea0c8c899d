use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use watchless::document::{Anchor, Document, DocumentNode, Frame, InlineNode, flatten_text};
use watchless::{timecode, video};

use crate::playback::PlayerOptions;
use crate::tree::{Control, ControlAction, RenderNode, RenderTree, TableView};

/// Non-greedy `[[...]]` run; `.` does not cross line breaks.
static WIKI_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[.*?\]\]").expect("wiki-link regex"));

const WIKI_MARKER: &str = "[[";

/// Applies the per-node render rules to a note body.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: PlayerOptions,
}

impl Renderer {
    pub fn new(options: PlayerOptions) -> Self {
        Renderer { options }
    }

    /// Render a body into a tree. Pure: the same document always yields an
    /// equal tree, control ids included.
    pub fn render(&self, document: &Document) -> RenderTree {
        let mut pass = RenderPass {
            options: &self.options,
            controls: Vec::new(),
        };
        let nodes = pass.blocks(&document.nodes);
        RenderTree {
            nodes,
            controls: pass.controls,
        }
    }
}

/// State of a single render pass.
struct RenderPass<'a> {
    options: &'a PlayerOptions,
    controls: Vec<Control>,
}

impl RenderPass<'_> {
    fn blocks(&mut self, nodes: &[DocumentNode]) -> Vec<RenderNode> {
        nodes.iter().map(|node| self.block(node)).collect()
    }

    fn block(&mut self, node: &DocumentNode) -> RenderNode {
        match node {
            // The title is shown by the surrounding chrome.
            DocumentNode::Heading { level: 1, .. } => RenderNode::Suppressed,
            DocumentNode::Heading { level, content } => RenderNode::Heading {
                level: *level,
                children: self.inlines(content),
            },
            DocumentNode::Paragraph { content } => self.paragraph(content),
            DocumentNode::Plain { content } => RenderNode::Plain {
                children: self.inlines(content),
            },
            DocumentNode::Table {
                alignments,
                headers,
                rows,
            } => RenderNode::TableWrapper {
                scrollable: true,
                bordered: true,
                table: TableView {
                    alignments: alignments.clone(),
                    headers: headers.iter().map(|cell| self.inlines(cell)).collect(),
                    rows: rows
                        .iter()
                        .map(|row| row.iter().map(|cell| self.inlines(cell)).collect())
                        .collect(),
                },
            },
            DocumentNode::Frame { frame } => self.frame(frame),
            DocumentNode::CodeBlock { language, content } => RenderNode::CodeBlock {
                language: language.clone(),
                content: content.clone(),
            },
            DocumentNode::Blockquote { document } => RenderNode::Blockquote {
                children: self.blocks(&document.nodes),
            },
            DocumentNode::OrderedList { start, items } => RenderNode::OrderedList {
                start: *start,
                items: items.iter().map(|item| self.blocks(&item.nodes)).collect(),
            },
            DocumentNode::UnorderedList { items } => RenderNode::UnorderedList {
                items: items.iter().map(|item| self.blocks(&item.nodes)).collect(),
            },
            DocumentNode::Html { html } => RenderNode::Html { html: html.clone() },
            DocumentNode::HorizontalRule => RenderNode::Rule,
        }
    }

    /// A paragraph that is a single text run containing `[[` is cut into
    /// plain and wiki-link segments. Anything else renders unchanged.
    fn paragraph(&mut self, content: &[InlineNode]) -> RenderNode {
        let children = match content {
            [InlineNode::Text(text)] if text.contains(WIKI_MARKER) => split_wiki_links(text),
            _ => self.inlines(content),
        };
        RenderNode::Paragraph { children }
    }

    fn inlines(&mut self, nodes: &[InlineNode]) -> Vec<RenderNode> {
        nodes.iter().map(|node| self.inline(node)).collect()
    }

    fn inline(&mut self, node: &InlineNode) -> RenderNode {
        match node {
            InlineNode::Text(text) => RenderNode::Text { text: text.clone() },
            InlineNode::Strong(children) => RenderNode::Strong {
                children: self.inlines(children),
            },
            InlineNode::Emphasis(children) => RenderNode::Emphasis {
                children: self.inlines(children),
            },
            InlineNode::Strikethrough(children) => RenderNode::Strikethrough {
                children: self.inlines(children),
            },
            InlineNode::CodeSpan(code) => RenderNode::Code { code: code.clone() },
            InlineNode::Link(anchor) => self.anchor(anchor),
            InlineNode::Image { dest, title, alt } => RenderNode::Image {
                src: dest.clone(),
                title: title.clone(),
                alt: flatten_text(alt),
            },
            InlineNode::Frame(frame) => self.frame(frame),
            InlineNode::Html(html) => RenderNode::Html { html: html.clone() },
            InlineNode::HardBreak => RenderNode::HardBreak,
        }
    }

    /// Timestamp anchors with a target become seek controls; everything else
    /// stays a navigating link.
    fn anchor(&mut self, anchor: &Anchor) -> RenderNode {
        let label = flatten_text(&anchor.content);
        let label = label.trim();
        let children = self.inlines(&anchor.content);
        let control = self.controls.len();

        if timecode::is_timestamp(label) && !anchor.dest.is_empty() {
            trace!(control, timestamp = label, "seek control");
            self.controls.push(Control {
                id: control,
                href: anchor.dest.clone(),
                action: ControlAction::Seek {
                    timestamp: label.to_string(),
                },
            });
            RenderNode::SeekControl {
                control,
                href: anchor.dest.clone(),
                timestamp: label.to_string(),
                children,
            }
        } else {
            trace!(control, href = anchor.dest.as_str(), "link");
            self.controls.push(Control {
                id: control,
                href: anchor.dest.clone(),
                action: ControlAction::Navigate,
            });
            RenderNode::Link {
                control,
                href: anchor.dest.clone(),
                title: anchor.title.clone(),
                children,
            }
        }
    }

    fn frame(&mut self, frame: &Frame) -> RenderNode {
        match frame.src.as_deref().and_then(video::embed_video_id) {
            Some(video_id) => RenderNode::VideoPlayer {
                video_id: video_id.to_string(),
                options: self.options.clone(),
            },
            None => RenderNode::Frame {
                frame: frame.clone(),
            },
        }
    }
}

/// Split text around `[[...]]` runs, keeping left-to-right order. Empty plain
/// segments are dropped, so the segment texts concatenate back to `text`.
pub fn split_wiki_links(text: &str) -> Vec<RenderNode> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in WIKI_LINK_REGEX.find_iter(text) {
        if m.start() > last {
            segments.push(RenderNode::Text {
                text: text[last..m.start()].to_string(),
            });
        }
        segments.push(RenderNode::WikiLink {
            text: m.as_str().to_string(),
        });
        last = m.end();
    }
    if last < text.len() {
        segments.push(RenderNode::Text {
            text: text[last..].to_string(),
        });
    }
    segments
}

#[cfg(test)]
mod tests {
    use watchless::parser::parse_document;

    use super::*;

    fn render(source: &str) -> RenderTree {
        Renderer::default().render(&parse_document(source))
    }

    fn text(s: &str) -> RenderNode {
        RenderNode::Text { text: s.to_string() }
    }

    fn wiki(s: &str) -> RenderNode {
        RenderNode::WikiLink { text: s.to_string() }
    }

    #[test]
    fn wiki_link_split_keeps_order_and_text() {
        let source = "See [[Note A]] and [[Note B]] for details";
        let segments = split_wiki_links(source);
        assert_eq!(
            segments,
            vec![
                text("See "),
                wiki("[[Note A]]"),
                text(" and "),
                wiki("[[Note B]]"),
                text(" for details"),
            ]
        );
        let joined: String = segments
            .iter()
            .map(|s| match s {
                RenderNode::Text { text } | RenderNode::WikiLink { text } => text.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn wiki_link_split_is_non_greedy_and_line_bound() {
        assert_eq!(split_wiki_links("[[a]]]]"), vec![wiki("[[a]]"), text("]]")]);
        assert_eq!(
            split_wiki_links("[[a\nb]] [[c]]"),
            vec![text("[[a\nb]] "), wiki("[[c]]")]
        );
        assert_eq!(split_wiki_links("[[open"), vec![text("[[open")]);
    }

    #[test]
    fn level_one_heading_is_suppressed() {
        let tree = render("# Title\n\n## Section\n");
        assert_eq!(tree.nodes[0], RenderNode::Suppressed);
        assert!(matches!(&tree.nodes[1], RenderNode::Heading { level: 2, .. }));
    }

    #[test]
    fn timestamp_anchor_becomes_seek_control() {
        let tree = render(
            "[12:34](https://youtu.be/x?t=754) and [Learn more](https://example.com)",
        );
        let RenderNode::Paragraph { children } = &tree.nodes[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            &children[0],
            RenderNode::SeekControl { control: 0, timestamp, .. } if timestamp == "12:34"
        ));
        assert!(matches!(
            &children[2],
            RenderNode::Link { control: 1, href, .. } if href == "https://example.com"
        ));
        assert_eq!(tree.seek_controls().count(), 1);
    }

    #[test]
    fn nested_timestamp_text_is_flattened() {
        let tree = render("[**1**:*15*:30](#t)");
        assert_eq!(
            tree.controls[0].action,
            ControlAction::Seek {
                timestamp: "1:15:30".into()
            }
        );
    }

    #[test]
    fn timestamp_without_target_stays_a_link() {
        let tree = render("[0:30]()");
        assert_eq!(tree.controls[0].action, ControlAction::Navigate);
    }

    #[test]
    fn loose_timestamp_text_is_not_a_control() {
        for label in ["at 0:30", "123:45", "0:3", "١:٢٣"] {
            let tree = render(&format!("[{label}](#x)"));
            assert_eq!(tree.controls[0].action, ControlAction::Navigate, "{label}");
        }
    }

    #[test]
    fn youtube_frame_becomes_player() {
        let tree = render("<iframe src=\"https://www.youtube.com/embed/abc123?si=q\"></iframe>\n");
        assert_eq!(
            tree.nodes,
            vec![RenderNode::VideoPlayer {
                video_id: "abc123".into(),
                options: PlayerOptions::default()
            }]
        );
        assert_eq!(tree.video_ids(), vec!["abc123"]);
    }

    #[test]
    fn other_frames_pass_through() {
        let tree = render(
            "<iframe src=\"https://player.vimeo.com/video/1\" width=\"640\"></iframe>\n",
        );
        let RenderNode::Frame { frame } = &tree.nodes[0] else {
            panic!("expected frame, got {:?}", tree.nodes);
        };
        assert_eq!(frame.attribute("width"), Some("640"));
        assert!(tree.video_ids().is_empty());
    }

    #[test]
    fn renderer_options_reach_the_player() {
        let options = PlayerOptions {
            width: "640".into(),
            height: "360".into(),
            autoplay: true,
        };
        let tree = Renderer::new(options.clone())
            .render(&parse_document("<iframe src=\"https://www.youtube.com/embed/v\"></iframe>\n"));
        assert_eq!(
            tree.nodes[0],
            RenderNode::VideoPlayer {
                video_id: "v".into(),
                options
            }
        );
    }

    #[test]
    fn table_is_wrapped_and_cells_are_rendered() {
        let tree = render("| Time | Topic |\n|---|---|\n| [1:15](#a) | Setup |\n");
        let RenderNode::TableWrapper {
            scrollable,
            bordered,
            table,
        } = &tree.nodes[0]
        else {
            panic!("expected table wrapper");
        };
        assert!(*scrollable && *bordered);
        assert_eq!(table.headers.len(), 2);
        assert!(matches!(&table.rows[0][0][0], RenderNode::SeekControl { .. }));
    }

    #[test]
    fn mixed_paragraph_keeps_wiki_text_unsplit() {
        let tree = render("**Bold** then [[Note]]");
        let RenderNode::Paragraph { children } = &tree.nodes[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(children[1], text(" then [[Note]]"));
    }

    fn first_item(tree: &RenderTree) -> &[RenderNode] {
        let RenderNode::UnorderedList { items } = &tree.nodes[0] else {
            panic!("expected list, got {:?}", tree.nodes);
        };
        &items[0]
    }

    #[test]
    fn tight_list_items_keep_wiki_text_unsplit() {
        let tree = render("- see [[X]]\n- other\n");
        assert_eq!(
            first_item(&tree),
            [RenderNode::Plain {
                children: vec![text("see [[X]]")]
            }]
        );
        assert!(tree.wiki_links().is_empty());
    }

    #[test]
    fn loose_list_paragraphs_are_split() {
        let tree = render("- see [[X]]\n\n- other\n");
        assert_eq!(
            first_item(&tree),
            [RenderNode::Paragraph {
                children: vec![text("see "), wiki("[[X]]")]
            }]
        );
    }

    #[test]
    fn tight_list_timestamps_still_seek() {
        let tree = render("- [0:30](#a) intro\n- [1:00](#b) next\n");
        assert_eq!(tree.seek_controls().count(), 2);
    }

    #[test]
    fn image_inside_anchor_is_not_a_timestamp() {
        let tree = render("[![0:30](thumb.png)](https://youtu.be/x?t=30)");
        assert_eq!(tree.controls[0].action, ControlAction::Navigate);
    }

    #[test]
    fn rendering_twice_is_identical() {
        let document = parse_document(
            "# T\n\n[0:10](#a) [[W]]\n\n| a |\n|---|\n| [x](#y) |\n\n<iframe src=\"https://www.youtube.com/embed/q\"></iframe>\n",
        );
        let renderer = Renderer::default();
        assert_eq!(renderer.render(&document), renderer.render(&document));
    }
}
