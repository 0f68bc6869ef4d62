//! Highlight Applicator
//!
//! Paints or unpaints a rendered-text range. Text nodes are split at the range
//! boundaries and the covered pieces are wrapped in (or moved out of) inline
//! `<span>` elements. Existing marks the range only partly covers are split
//! so that the uncovered remainder keeps its paint, and the first remainder
//! keeps the annotation's metadata. Painted block elements are never split:
//! they are repainted or cleared only when the range covers all their text.
//!
//! Identity is never assigned here: callers rescan afterwards.

use std::collections::HashSet;

use tracing::debug;

use crate::config::AnchorConfig;
use crate::html::search::is_block_element;
use crate::html::text::is_html_space;
use crate::html::{Document, NodeId, TextIndex, TextRange, TextSegment};

use super::scanner::{clear_footprint, heal_footprints, metadata_attributes, paint, strip_metadata};

const PAINT_PROPERTY: &str = "background-color";

/// Paint `range` with `color`. Returns how many elements were painted.
pub fn apply_highlight(
    doc: &mut Document,
    range: TextRange,
    color: &str,
    config: &AnchorConfig,
) -> usize {
    let painted = paint_range(doc, range, Some(color), config);
    doc.clear_selection();
    painted
}

/// Remove paint from `range`. Returns how many marks were cleared or split.
pub fn remove_highlight(doc: &mut Document, range: TextRange, config: &AnchorConfig) -> usize {
    let cleared = paint_range(doc, range, None, config);
    doc.clear_selection();
    cleared
}

fn paint_range(
    doc: &mut Document,
    range: TextRange,
    color: Option<&str>,
    config: &AnchorConfig,
) -> usize {
    let index = TextIndex::build(doc);
    if range.is_collapsed() || range.end > index.len() {
        debug!(?range, length = index.len(), "Ignoring empty or out-of-bounds range");
        return 0;
    }

    // Mark ranges are taken before any mutation; rendered offsets survive it
    let mut marks: Vec<(NodeId, Option<TextRange>)> = Vec::new();
    for segment in index.segments(range) {
        let (inline, blocks) = enclosing_marks(doc, segment.node);
        if let Some(mark) = inline {
            if !marks.iter().any(|(seen, _)| *seen == mark) {
                marks.push((mark, index.element_range(doc, mark)));
            }
        }
        for block in blocks {
            let block_range = index.element_range(doc, block);
            let covered = block_range.map(|r| range.covers(&r)).unwrap_or(false);
            if covered && !marks.iter().any(|(seen, _)| *seen == block) {
                marks.push((block, block_range));
            }
        }
    }

    let mut changed = 0;
    let mut restyled: HashSet<NodeId> = HashSet::new();

    for (mark, mark_range) in marks {
        match (mark_range, color) {
            (Some(mark_range), _) if !range.covers(&mark_range) => {
                split_mark(doc, mark, mark_range, range, config);
                if color.is_none() {
                    changed += 1;
                }
            }
            (_, Some(color)) => {
                doc.set_style_property(mark, PAINT_PROPERTY, color);
                strip_metadata(doc, mark, config);
                restyled.insert(mark);
                changed += 1;
            }
            (_, None) => {
                clear_footprint(doc, mark, config);
                changed += 1;
            }
        }
    }

    if let Some(color) = color {
        changed += paint_text(doc, range, color, &restyled).len();
    }

    heal_footprints(doc, config);
    changed
}

/// Nearest painted inline ancestor of a text node, and every painted block
/// ancestor. The inline search ends at the first block.
fn enclosing_marks(doc: &Document, node: NodeId) -> (Option<NodeId>, Vec<NodeId>) {
    let mut inline = None;
    let mut blocks = Vec::new();
    let mut inside_block = false;
    let mut current = doc.parent(node);

    while let Some(element) = current {
        let Some(name) = doc.tag_name(element) else {
            break;
        };
        let painted = paint(doc, element).is_some();
        if is_block_element(name) {
            inside_block = true;
            if painted {
                blocks.push(element);
            }
        } else if painted && !inside_block && inline.is_none() {
            inline = Some(element);
        }
        current = doc.parent(element);
    }
    (inline, blocks)
}

/// Unpaint a mark and repaint the parts of it that lie outside `range`
fn split_mark(
    doc: &mut Document,
    mark: NodeId,
    mark_range: TextRange,
    range: TextRange,
    config: &AnchorConfig,
) {
    let Some(color) = paint(doc, mark) else {
        return;
    };
    let metadata: Vec<(String, String)> = metadata_attributes(config)
        .iter()
        .filter_map(|name| {
            doc.attr(mark, name)
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    clear_footprint(doc, mark, config);

    let remainders = [
        TextRange::new(mark_range.start, range.start.max(mark_range.start)),
        TextRange::new(range.end.min(mark_range.end), mark_range.end),
    ];

    let mut metadata_owner: Option<NodeId> = None;
    for remainder in remainders.into_iter().filter(|r| !r.is_collapsed()) {
        let painted = paint_text(doc, remainder, &color, &HashSet::new());
        if metadata_owner.is_none() {
            metadata_owner = painted.first().copied();
        }
    }

    if let Some(owner) = metadata_owner {
        for (name, value) in &metadata {
            doc.set_attr(owner, name, value);
        }
    }
}

/// Paint every text piece of `range`, skipping pieces inside `skip`.
/// Returns the painted elements in document order.
fn paint_text(
    doc: &mut Document,
    range: TextRange,
    color: &str,
    skip: &HashSet<NodeId>,
) -> Vec<NodeId> {
    let index = TextIndex::build(doc);
    let mut painted = Vec::new();

    for segment in index.segments(range) {
        if skip.iter().any(|element| doc.contains(*element, segment.node)) {
            continue;
        }
        let blank = doc
            .text(segment.node)
            .and_then(|text| text.get(segment.start..segment.end))
            .map(|piece| piece.chars().all(is_html_space))
            .unwrap_or(true);
        if blank {
            continue;
        }

        let node = isolate(doc, segment);
        painted.push(paint_node(doc, node, color));
    }

    painted
}

/// Split a text node so the segment is a node of its own
fn isolate(doc: &mut Document, segment: TextSegment) -> NodeId {
    let length = doc.text(segment.node).map(str::len).unwrap_or(0);
    if segment.end < length {
        doc.split_text(segment.node, segment.end);
    }
    if segment.start > 0 {
        if let Some(piece) = doc.split_text(segment.node, segment.start) {
            return piece;
        }
    }
    segment.node
}

fn paint_node(doc: &mut Document, node: NodeId, color: &str) -> NodeId {
    if let Some(parent) = doc.parent(node) {
        let reusable = doc.tag_name(parent) == Some("span")
            && doc.children(parent).len() == 1
            && paint(doc, parent).is_none();
        if reusable {
            doc.set_style_property(parent, PAINT_PROPERTY, color);
            return parent;
        }
    }
    let span = doc.wrap(node, "span");
    doc.set_style_property(span, PAINT_PROPERTY, color);
    span
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::annotations::scanner::scan;
    use crate::source::testing::TestEnv;

    fn range_of(doc: &Document, needle: &str) -> TextRange {
        TextIndex::build(doc).find(needle, 0, true).unwrap()
    }

    #[test]
    fn test_apply_wraps_plain_text() {
        let mut doc = Document::parse("<p>Hello big world</p>").unwrap();
        let range = range_of(&doc, "big");

        assert_eq!(apply_highlight(&mut doc, range, "#ffff00", &AnchorConfig::default()), 1);
        assert_eq!(
            doc.to_html(),
            r#"<p>Hello <span style="background-color: #ffff00;">big</span> world</p>"#
        );
    }

    #[test]
    fn test_apply_across_inline_elements() {
        let mut doc = Document::parse("<p>Hello <b>big</b> world</p>").unwrap();
        let range = range_of(&doc, "lo big wo");

        assert_eq!(apply_highlight(&mut doc, range, "#ffff00", &AnchorConfig::default()), 3);
        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<p>Hel<span style="background-color: #ffff00;">lo </span>"#,
                r#"<b><span style="background-color: #ffff00;">big</span></b>"#,
                r#"<span style="background-color: #ffff00;"> wo</span>rld</p>"#
            )
        );
        assert_eq!(TextIndex::build(&doc).as_string(), "Hello big world");
    }

    #[test]
    fn test_apply_reuses_bare_span() {
        let mut doc = Document::parse(r#"<p>a <span class="q">quote</span> b</p>"#).unwrap();
        let range = range_of(&doc, "quote");

        apply_highlight(&mut doc, range, "#ffff00", &AnchorConfig::default());
        assert_eq!(
            doc.to_html(),
            r#"<p>a <span class="q" style="background-color: #ffff00;">quote</span> b</p>"#
        );
    }

    #[test]
    fn test_apply_over_whole_mark_recolors_it() {
        let mut doc = Document::parse(
            r#"<p>x <span style="background-color: #ffff00;" data-annotation-id="a">mark</span> y</p>"#,
        )
        .unwrap();
        let range = range_of(&doc, "mark");

        assert_eq!(apply_highlight(&mut doc, range, "#ff0000", &AnchorConfig::default()), 1);
        assert_eq!(
            doc.to_html(),
            r#"<p>x <span style="background-color: #ff0000;">mark</span> y</p>"#
        );
    }

    #[test]
    fn test_apply_inside_mark_splits_it() {
        let mut env = TestEnv::default();
        let mut doc = Document::parse(
            r#"<p><span style="background-color: #ffff00;" data-annotation-id="a" data-timestamp="2024-01-01T00:00:00.000Z">one two three</span></p>"#,
        )
        .unwrap();
        let range = range_of(&doc, "two");

        apply_highlight(&mut doc, range, "#ff0000", &env.config.clone());

        let annotations = scan(&mut doc, &mut env.context());
        let summary: Vec<(&str, &str, &str)> = annotations
            .iter()
            .map(|a| (a.id.as_str(), a.text.as_str(), a.color.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a", "one", "#ffff00"),
                ("ann-1", "two", "#ff0000"),
                ("ann-2", "three", "#ffff00"),
            ]
        );
        assert_eq!(annotations[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_remove_whole_mark_unwraps_span() {
        let mut doc = Document::parse(
            r#"<p>Hello <span style="background-color: #ffff00;" data-annotation-id="a" data-comment="c">big</span> world</p>"#,
        )
        .unwrap();
        let range = range_of(&doc, "Hello big world");

        assert_eq!(remove_highlight(&mut doc, range, &AnchorConfig::default()), 1);
        assert_eq!(doc.to_html(), "<p>Hello big world</p>");
    }

    #[test]
    fn test_remove_part_of_mark_keeps_remainder() {
        let mut env = TestEnv::default();
        let mut doc = Document::parse(
            r#"<p><span style="background-color: #ffff00;" data-annotation-id="a" data-comment="note">one two three</span></p>"#,
        )
        .unwrap();
        let range = range_of(&doc, "one");

        remove_highlight(&mut doc, range, &env.config.clone());

        let annotations = scan(&mut doc, &mut env.context());
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].id, "a");
        assert_eq!(annotations[0].text, "two three");
        assert_eq!(annotations[0].comment.as_deref(), Some("note"));
        assert!(doc.to_html().starts_with("<p>one<span"));
    }

    #[test]
    fn test_block_background_is_not_a_mark() {
        let mut doc = Document::parse(
            r#"<html><body style="background-color: white"><p>Hello there</p></body></html>"#,
        )
        .unwrap();
        let range = range_of(&doc, "there");

        apply_highlight(&mut doc, range, "#ffff00", &AnchorConfig::default());
        assert_eq!(
            doc.to_html(),
            r#"<html><body style="background-color: white"><p>Hello <span style="background-color: #ffff00;">there</span></p></body></html>"#
        );
    }

    #[test]
    fn test_remove_over_whole_painted_block_clears_it() {
        let mut env = TestEnv::default();
        let mut doc = Document::parse(
            r#"<div><p style="background-color: yellow" data-annotation-id="p1">hello world</p><p>after</p></div>"#,
        )
        .unwrap();
        let config = env.config.clone();

        let partial = range_of(&doc, "world");
        assert_eq!(remove_highlight(&mut doc, partial, &config), 0);
        assert_eq!(scan(&mut doc, &mut env.context()).len(), 1);

        let whole = range_of(&doc, "hello world");
        assert_eq!(remove_highlight(&mut doc, whole, &config), 1);
        assert_eq!(doc.to_html(), "<div><p>hello world</p><p>after</p></div>");
        assert!(scan(&mut doc, &mut env.context()).is_empty());
    }

    #[test]
    fn test_apply_over_whole_painted_block_recolors_it() {
        let mut doc =
            Document::parse(r#"<div><p style="background: yellow">hello world</p></div>"#).unwrap();
        let range = range_of(&doc, "hello world");

        assert_eq!(apply_highlight(&mut doc, range, "#90ee90", &AnchorConfig::default()), 1);
        assert_eq!(
            doc.to_html(),
            r#"<div><p style="background: yellow; background-color: #90ee90;">hello world</p></div>"#
        );
    }

    #[test]
    fn test_empty_and_out_of_bounds_ranges_are_noops() {
        let mut doc = Document::parse("<p>short</p>").unwrap();
        doc.set_selection(TextRange::new(0, 2));
        let revision = doc.revision();
        let config = AnchorConfig::default();

        assert_eq!(apply_highlight(&mut doc, TextRange::collapsed(2), "#ffff00", &config), 0);
        assert_eq!(apply_highlight(&mut doc, TextRange::new(0, 99), "#ffff00", &config), 0);
        assert_eq!(remove_highlight(&mut doc, TextRange::new(3, 99), &config), 0);

        assert_eq!(doc.revision(), revision);
        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_blank_segments_between_blocks_stay_unpainted() {
        let mut doc = Document::parse("<div><p>foo</p>\n<p>bar</p></div>").unwrap();
        let range = range_of(&doc, "foo bar");

        assert_eq!(apply_highlight(&mut doc, range, "#ffff00", &AnchorConfig::default()), 2);
        assert!(doc.to_html().contains("</p>\n<p>"));
    }
}
