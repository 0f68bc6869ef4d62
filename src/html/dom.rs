//! In-memory HTML document tree
//!
//! Documents are parsed into an arena of nodes addressed by [`NodeId`].
//! Detached nodes stay in the arena but are no longer reachable from the
//! root, so they take no part in traversal, search or serialization.
//!
//! Parsing is lenient: mismatched end tags close the nearest matching open
//! element, unmatched end tags are ignored, and unclosed elements are closed
//! at end of input. A `<` that cannot open markup (`5 < 6`, `<3`) is text.

use std::borrow::Cow;
use std::cmp::Ordering;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::search::TextRange;

/// Elements that never have children or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is serialized without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Errors while building or rewriting a document
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("HTML parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),
}

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element name and attributes, in source order
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    selection: Option<TextRange>,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            selection: None,
            revision: 0,
        }
    }

    /// Parse HTML into a document tree
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let mut doc = Self::new();
        let html = escape_stray_angles(html);
        let mut reader = Reader::from_str(&html);
        reader.trim_text(false);
        reader.check_end_names(false);
        reader.check_comments(false);

        let mut open: Vec<NodeId> = vec![doc.root()];

        loop {
            let event = reader.read_event().map_err(|e| DomError::Parse {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;

            let parent = open.last().copied().unwrap_or_else(|| doc.root());

            match event {
                Event::Start(start) => {
                    let element = doc.element_from_tag(&start);
                    doc.append_child(parent, element);
                    let is_void = doc
                        .tag_name(element)
                        .map(|name| VOID_ELEMENTS.contains(&name))
                        .unwrap_or(false);
                    if !is_void {
                        open.push(element);
                    }
                }
                Event::Empty(start) => {
                    let element = doc.element_from_tag(&start);
                    doc.append_child(parent, element);
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                    // Never pop the document root
                    if let Some(depth) = open
                        .iter()
                        .skip(1)
                        .rposition(|id| doc.tag_name(*id) == Some(name.as_str()))
                    {
                        open.truncate(depth + 1);
                    }
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text.into_inner()).into_owned();
                    let content = html_escape::decode_html_entities(&raw);
                    let node = doc.create_text(&content);
                    doc.append_child(parent, node);
                }
                Event::CData(data) => {
                    let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    let node = doc.create_text(&content);
                    doc.append_child(parent, node);
                }
                Event::Comment(comment) => {
                    let content = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                    let node = doc.push_node(NodeKind::Comment(content));
                    doc.append_child(parent, node);
                }
                Event::DocType(doctype) => {
                    let content = String::from_utf8_lossy(&doctype.into_inner())
                        .trim()
                        .to_string();
                    let node = doc.push_node(NodeKind::Doctype(content));
                    doc.append_child(parent, node);
                }
                Event::Decl(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
        }

        doc.revision = 0;
        Ok(doc)
    }

    fn element_from_tag(&mut self, start: &BytesStart<'_>) -> NodeId {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();

        let mut attributes = start.html_attributes();
        attributes.with_checks(false);
        let attrs = attributes
            .filter_map(|attr| attr.ok())
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                let raw = String::from_utf8_lossy(&attr.value).into_owned();
                let value = html_escape::decode_html_entities(&raw).into_owned();
                (key, value)
            })
            .collect();

        self.push_node(NodeKind::Element(ElementData { name, attrs }))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Mutation counter, bumped by every structural, attribute or text change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The `<body>` element, or the root when the document has none
    pub fn body(&self) -> NodeId {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.tag_name(*id) == Some("body"))
            .unwrap_or_else(|| self.root())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element(el) => Some(el.name.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    // ============================================
    // Attributes and inline style
    // ============================================

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attributes(&self, id: NodeId) -> bool {
        self.element(id).map(|el| !el.attrs.is_empty()).unwrap_or(false)
    }

    /// Set an attribute; only counts as a mutation when the value changes
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) if existing == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
        self.touch();
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        let before = el.attrs.len();
        el.attrs.retain(|(key, _)| key != name);
        let removed = el.attrs.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Read one property from the inline `style` attribute
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_style(style)
            .into_iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Every declaration of the inline `style` attribute, in source order
    pub fn style_declarations(&self, id: NodeId) -> Vec<(String, String)> {
        self.attr(id, "style").map(parse_style).unwrap_or_default()
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut declarations = self.attr(id, "style").map(parse_style).unwrap_or_default();
        declarations.retain(|(name, _)| name != property);
        declarations.push((property.to_string(), value.to_string()));
        self.set_attr(id, "style", &format_style(&declarations));
    }

    /// Remove a style property, dropping the `style` attribute once empty
    pub fn remove_style_property(&mut self, id: NodeId, property: &str) -> bool {
        let Some(style) = self.attr(id, "style") else {
            return false;
        };
        let mut declarations = parse_style(style);
        let before = declarations.len();
        declarations.retain(|(name, _)| name != property);
        if declarations.len() == before {
            return false;
        }
        if declarations.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", &format_style(&declarations));
        }
        true
    }

    // ============================================
    // Traversal
    // ============================================

    /// All nodes under `id` in document order, `id` included
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every element in the document, in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.tag_name(*id).is_some())
            .collect()
    }

    /// Whether `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Child-index path from the root; empty for the root or detached nodes
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut steps = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            match self.children(parent).iter().position(|child| *child == current) {
                Some(index) => steps.push(index),
                None => return Vec::new(),
            }
            current = parent;
        }
        steps.reverse();
        steps
    }

    /// Order two nodes by document position.
    ///
    /// An ancestor comes before its descendants.
    pub fn compare_position(&self, a: NodeId, b: NodeId) -> Ordering {
        let path_a = self.path(a);
        let path_b = self.path(b);
        for (step_a, step_b) in path_a.iter().zip(path_b.iter()) {
            let cmp = step_a.cmp(step_b);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        path_a.len().cmp(&path_b.len())
    }

    // ============================================
    // Tree mutation
    // ============================================

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Copy an element's name and the attributes `keep` accepts, without children
    pub fn clone_element<F>(&mut self, id: NodeId, keep: F) -> Option<NodeId>
    where
        F: Fn(&str) -> bool,
    {
        let source = self.element(id)?;
        let data = ElementData {
            name: source.name.clone(),
            attrs: source
                .attrs
                .iter()
                .filter(|(key, _)| keep(key))
                .cloned()
                .collect(),
        };
        Some(self.push_node(NodeKind::Element(data)))
    }

    /// Remove a node from its parent; the subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
            self.touch();
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.touch();
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        self.insert_relative(reference, node, 0);
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.insert_relative(reference, node, 1);
    }

    fn insert_relative(&mut self, reference: NodeId, node: NodeId, shift: usize) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let Some(index) = self.children(parent).iter().position(|c| *c == reference) else {
            return;
        };
        self.nodes[parent.0].children.insert(index + shift, node);
        self.nodes[node.0].parent = Some(parent);
        self.touch();
    }

    /// Wrap a node in a new element placed where the node was
    pub fn wrap(&mut self, node: NodeId, tag: &str) -> NodeId {
        let wrapper = self.create_element(tag);
        self.insert_before(node, wrapper);
        self.append_child(wrapper, node);
        wrapper
    }

    /// Replace an element with its children
    pub fn unwrap(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        for child in self.children(id).to_vec() {
            self.insert_before(id, child);
        }
        self.detach(id);
        self.merge_adjacent_text(parent);
    }

    /// Split a text node at a byte offset.
    ///
    /// The node keeps the head; the tail moves into a new sibling that is
    /// returned. Offsets at either end or off a char boundary split nothing.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        if offset == 0 || offset >= text.len() || !text.is_char_boundary(offset) {
            return None;
        }
        let tail = text[offset..].to_string();
        if let NodeKind::Text(head) = &mut self.nodes[id.0].kind {
            head.truncate(offset);
        }
        let tail_node = self.create_text(&tail);
        self.insert_after(id, tail_node);
        Some(tail_node)
    }

    /// Fold runs of adjacent text children into their first node
    pub fn merge_adjacent_text(&mut self, parent: NodeId) {
        let children = self.children(parent).to_vec();
        let mut previous_text: Option<NodeId> = None;

        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                previous_text = None;
                continue;
            };
            match previous_text {
                Some(target) => {
                    if let NodeKind::Text(existing) = &mut self.nodes[target.0].kind {
                        existing.push_str(&text);
                    }
                    self.detach(child);
                }
                None => previous_text = Some(child),
            }
        }
    }

    // ============================================
    // Selection
    // ============================================

    /// Current selection in rendered-text coordinates
    pub fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    pub fn set_selection(&mut self, range: TextRange) {
        self.selection = Some(range);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ============================================
    // Serialization
    // ============================================

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
            }
            NodeKind::Doctype(content) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(content.trim_start_matches("DOCTYPE").trim_start_matches("doctype").trim());
                out.push('>');
            }
            NodeKind::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
            NodeKind::Text(text) => {
                let raw = self
                    .parent(id)
                    .and_then(|parent| self.tag_name(parent))
                    .map(|name| RAW_TEXT_ELEMENTS.contains(&name))
                    .unwrap_or(false);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(text));
                }
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (key, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&html_escape::encode_double_quoted_attribute(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

/// Escape every `<` that does not start a tag, comment or declaration.
///
/// Comments pass through untouched. Raw text element content is escaped
/// whole and decoded again when its text node is built.
fn escape_stray_angles(html: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut rest_start = 0;

    while let Some(found) = html[rest_start..].find('<') {
        let at = rest_start + found;
        let tail = &html[at..];

        let starts_markup = tail[1..]
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
            .unwrap_or(false);

        if !starts_markup {
            out.push_str(&html[copied..at]);
            out.push_str("&lt;");
            copied = at + 1;
            rest_start = at + 1;
            continue;
        }

        rest_start = if tail.starts_with("<!--") {
            tail.find("-->").map(|end| at + end + 3).unwrap_or(html.len())
        } else if let Some(content_start) = raw_text_content_start(tail) {
            let start = at + content_start;
            let content = &html[start..];
            let close = format!("</{}", raw_text_name(tail).unwrap_or_default());
            let end = start
                + content
                    .to_ascii_lowercase()
                    .find(&close)
                    .unwrap_or(content.len());
            if html[start..end].contains(|c: char| c == '<' || c == '&') {
                out.push_str(&html[copied..start]);
                out.push_str(&html[start..end].replace('&', "&amp;").replace('<', "&lt;"));
                copied = end;
            }
            end
        } else {
            at + 1
        };
    }

    if copied == 0 {
        return Cow::Borrowed(html);
    }
    out.push_str(&html[copied..]);
    Cow::Owned(out)
}

/// Name of the raw text element a start tag opens, if any
fn raw_text_name(tail: &str) -> Option<&'static str> {
    RAW_TEXT_ELEMENTS.iter().copied().find(|name| {
        let after = 1 + name.len();
        tail.get(1..after)
            .map(|tag| tag.eq_ignore_ascii_case(name))
            .unwrap_or(false)
            && tail[after..]
                .chars()
                .next()
                .map(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
                .unwrap_or(false)
    })
}

/// Offset just past the start tag of a non-empty raw text element
fn raw_text_content_start(tail: &str) -> Option<usize> {
    raw_text_name(tail)?;
    let end = tail.find('>')?;
    (!tail[..end].ends_with('/')).then_some(end + 1)
}

/// Split an inline style into lowercase property names and trimmed values
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim().to_string()))
        })
        .collect()
}

fn format_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}
