//! Source findings for notes that render, but not the way their author likely meant.
//!
//! Rendering never fails on these; `check` only reports them.

use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use crate::document::{Document, DocumentNode, InlineNode, flatten_text};
use crate::frontmatter::{self, DecodeStrategy};
use crate::{Note, timecode};

/// A finding with source location information.
#[derive(Debug, Clone)]
pub struct Finding {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl Finding {
    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Finding {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

/// Check a note's source and return every finding, in source order.
pub fn check(source: &str, file_id: usize) -> Vec<Finding> {
    let mut findings = Vec::new();

    match frontmatter::locate(source) {
        Some(block) => {
            check_properties(block.content, block.content_offset, file_id, &mut findings)
        }
        None => {
            let first_line = source.lines().next().unwrap_or("");
            if first_line.trim_end() == "---" {
                findings.push(
                    Finding::warning(
                        "front-matter has no closing `---` line",
                        0..first_line.len(),
                        file_id,
                    )
                    .with_note("the whole note is rendered as body text"),
                );
            }
        }
    }

    let note = Note::parse(source);
    check_links(&note.body, note.body_offset, file_id, &mut findings);
    findings
}

fn check_properties(block: &str, block_offset: usize, file_id: usize, findings: &mut Vec<Finding>) {
    for entry in frontmatter::entries(block) {
        let (_, strategy) = frontmatter::decode_value_with_strategy(entry.raw_value);
        if strategy == DecodeStrategy::CommaList {
            let span = block_offset + entry.value_span.start..block_offset + entry.value_span.end;
            findings.push(
                Finding::warning(
                    format!("list value of `{}` is not a JSON array; split on commas", entry.key),
                    span,
                    file_id,
                )
                .with_note("quoted items that contain commas are split apart"),
            );
        }
    }
}

fn check_links(
    document: &Document,
    body_offset: usize,
    file_id: usize,
    findings: &mut Vec<Finding>,
) {
    for node in &document.nodes {
        match node {
            DocumentNode::Paragraph { content }
            | DocumentNode::Plain { content }
            | DocumentNode::Heading { content, .. } => {
                check_inlines(content, body_offset, file_id, findings)
            }
            DocumentNode::Table { headers, rows, .. } => {
                for cell in headers.iter().chain(rows.iter().flatten()) {
                    check_inlines(cell, body_offset, file_id, findings);
                }
            }
            DocumentNode::Blockquote { document } => {
                check_links(document, body_offset, file_id, findings)
            }
            DocumentNode::OrderedList { items, .. } | DocumentNode::UnorderedList { items } => {
                for item in items {
                    check_links(item, body_offset, file_id, findings);
                }
            }
            DocumentNode::CodeBlock { .. }
            | DocumentNode::Frame { .. }
            | DocumentNode::Html { .. }
            | DocumentNode::HorizontalRule => {}
        }
    }
}

fn check_inlines(
    inlines: &[InlineNode],
    body_offset: usize,
    file_id: usize,
    findings: &mut Vec<Finding>,
) {
    for inline in inlines {
        match inline {
            InlineNode::Link(anchor) => {
                let label = flatten_text(&anchor.content);
                if anchor.dest.is_empty() && timecode::is_timestamp(label.trim()) {
                    let span = body_offset + anchor.span.start..body_offset + anchor.span.end;
                    findings.push(
                        Finding::warning(
                            format!("timestamp link `{}` has no target", label.trim()),
                            span,
                            file_id,
                        )
                        .with_note("it renders as a plain link and does not seek the video"),
                    );
                }
                check_inlines(&anchor.content, body_offset, file_id, findings);
            }
            InlineNode::Strong(children)
            | InlineNode::Emphasis(children)
            | InlineNode::Strikethrough(children) => {
                check_inlines(children, body_offset, file_id, findings)
            }
            _ => {}
        }
    }
}
