//! Rendered-text index and search
//!
//! Search runs against the document's rendered text: the text under
//! `<body>` with every whitespace run collapsed to one space and block
//! boundaries acting as whitespace. Each character of the rendered text
//! remembers which text node (and byte range) it came from, so a match can be
//! mapped back onto the tree.
//!
//! Wrapping text in inline elements or splitting text nodes leaves the
//! rendered text unchanged, so character offsets stay valid across highlight
//! operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::dom::{Document, NodeId, NodeKind};
use super::text::is_html_space;

/// Elements whose content is never rendered
const HIDDEN_ELEMENTS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "iframe", "object",
];

/// Elements that start and end a line of rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Whether an element starts its own line of rendered text
pub fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name) || matches!(name, "body" | "html")
}

/// Half-open range of character offsets in the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Whether `other` lies entirely inside this range
    pub fn covers(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A byte range inside one text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Where a rendered character came from. Synthetic characters (block
/// boundaries) have an empty byte range.
#[derive(Debug, Clone, Copy)]
struct CharSource {
    node: NodeId,
    start: usize,
    end: usize,
}

impl CharSource {
    fn is_synthetic(&self) -> bool {
        self.start == self.end
    }
}

/// Rendered text of a document with a map back to its text nodes
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    chars: Vec<char>,
    sources: Vec<CharSource>,
    node_ranges: HashMap<NodeId, (usize, usize)>,
}

impl TextIndex {
    /// Index the rendered text under the document body
    pub fn build(doc: &Document) -> Self {
        let mut builder = IndexBuilder::default();
        builder.visit(doc, doc.body());
        builder.index
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn slice(&self, range: TextRange) -> String {
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Find the first occurrence of `needle` starting at or after `from`
    pub fn find(&self, needle: &str, from: usize, case_sensitive: bool) -> Option<TextRange> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() {
            return None;
        }
        let last_start = self.chars.len().checked_sub(needle.len())?;

        (from..=last_start)
            .find(|&start| {
                self.chars[start..start + needle.len()]
                    .iter()
                    .zip(&needle)
                    .all(|(a, b)| chars_match(*a, *b, case_sensitive))
            })
            .map(|start| TextRange::new(start, start + needle.len()))
    }

    /// Map a rendered-text range onto text node byte ranges, in document order
    pub fn segments(&self, range: TextRange) -> Vec<TextSegment> {
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        let mut segments: Vec<TextSegment> = Vec::new();

        for source in &self.sources[start..end] {
            if source.is_synthetic() {
                continue;
            }
            match segments.last_mut() {
                Some(segment) if segment.node == source.node => {
                    segment.start = segment.start.min(source.start);
                    segment.end = segment.end.max(source.end);
                }
                _ => segments.push(TextSegment {
                    node: source.node,
                    start: source.start,
                    end: source.end,
                }),
            }
        }

        segments
    }

    /// Rendered range of an element's text, without surrounding spaces
    pub fn element_range(&self, doc: &Document, element: NodeId) -> Option<TextRange> {
        let (mut start, mut end) = doc
            .descendants(element)
            .into_iter()
            .filter_map(|id| self.node_ranges.get(&id).copied())
            .fold(None, |acc: Option<(usize, usize)>, (s, e)| match acc {
                Some((min, max)) => Some((min.min(s), max.max(e))),
                None => Some((s, e)),
            })?;

        while start < end && self.chars[start] == ' ' {
            start += 1;
        }
        while end > start && self.chars[end - 1] == ' ' {
            end -= 1;
        }

        (start < end).then(|| TextRange::new(start, end))
    }

    /// An element's rendered text, empty when it renders nothing
    pub fn element_text(&self, doc: &Document, element: NodeId) -> String {
        self.element_range(doc, element)
            .map(|range| self.slice(range))
            .unwrap_or_default()
    }
}

fn chars_match(a: char, b: char, case_sensitive: bool) -> bool {
    a == b || (!case_sensitive && a.to_lowercase().eq(b.to_lowercase()))
}

#[derive(Default)]
struct IndexBuilder {
    index: TextIndex,
    pending_space: Option<CharSource>,
    pending_break: bool,
}

impl IndexBuilder {
    fn visit(&mut self, doc: &Document, id: NodeId) {
        match doc.kind(id) {
            NodeKind::Text(text) => self.push_text(id, text),
            NodeKind::Element(el) => {
                let name = el.name.as_str();
                if HIDDEN_ELEMENTS.contains(&name) {
                    return;
                }
                let is_block = BLOCK_ELEMENTS.contains(&name);
                if is_block {
                    self.pending_break = true;
                }
                for child in doc.children(id) {
                    self.visit(doc, *child);
                }
                if is_block {
                    self.pending_break = true;
                }
            }
            NodeKind::Document => {
                for child in doc.children(id) {
                    self.visit(doc, *child);
                }
            }
            NodeKind::Doctype(_) | NodeKind::Comment(_) => {}
        }
    }

    fn push_text(&mut self, node: NodeId, text: &str) {
        for (offset, ch) in text.char_indices() {
            let end = offset + ch.len_utf8();
            if is_html_space(ch) {
                match &mut self.pending_space {
                    // Only extend runs within one node; the first node owns the space
                    Some(space) if space.node == node && space.end == offset => space.end = end,
                    Some(_) => {}
                    None => {
                        self.pending_space = Some(CharSource {
                            node,
                            start: offset,
                            end,
                        })
                    }
                }
                continue;
            }

            self.flush_space();
            self.push(
                ch,
                CharSource {
                    node,
                    start: offset,
                    end,
                },
            );
        }
    }

    fn flush_space(&mut self) {
        let pending = self.pending_space.take();
        let pending_break = std::mem::take(&mut self.pending_break);
        if self.index.chars.is_empty() || (pending.is_none() && !pending_break) {
            return;
        }

        let source = match (pending, self.index.sources.last()) {
            (Some(space), _) => space,
            (None, Some(last)) => CharSource {
                node: last.node,
                start: last.end,
                end: last.end,
            },
            (None, None) => return,
        };
        self.push(' ', source);
    }

    fn push(&mut self, ch: char, source: CharSource) {
        let position = self.index.chars.len();
        self.index.chars.push(ch);
        self.index.sources.push(source);
        if !source.is_synthetic() {
            self.index
                .node_ranges
                .entry(source.node)
                .and_modify(|range| range.1 = position + 1)
                .or_insert((position, position + 1));
        }
    }
}
