//! Document scanning
//!
//! The annotation list is never stored; it is derived from the document by
//! [`scan`] after every mutation. An annotation's footprint on its element is
//! the paint (`background-color`, or the color of a `background` shorthand)
//! plus the id, timestamp and comment attributes, and the helpers here always
//! change those as a unit.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::AnchorConfig;
use crate::html::{Document, NodeId, TextIndex};
use crate::source::Context;

use super::color::{parse_paint, shorthand_paint, strip_shorthand_color};
use super::types::{format_timestamp, parse_timestamp, Annotation};

/// Normalized paint of an element, if it is painted at all.
///
/// The later of `background-color` and the `background` shorthand wins.
pub fn paint(doc: &Document, element: NodeId) -> Option<String> {
    doc.style_declarations(element)
        .into_iter()
        .rev()
        .find_map(|(name, value)| match name.as_str() {
            "background-color" => Some(parse_paint(&value)),
            "background" => Some(shorthand_paint(&value)),
            _ => None,
        })
        .flatten()
}

/// Derive the annotation list from the document, in document order.
///
/// Painted elements missing an id or timestamp get one stamped on them, and
/// unpainted elements lose any stale metadata. A second scan without
/// intervening changes does not touch the document.
pub fn scan(doc: &mut Document, ctx: &mut Context<'_>) -> Vec<Annotation> {
    let config = ctx.config;
    let index = TextIndex::build(doc);
    let mut seen: HashSet<String> = HashSet::new();
    let mut annotations = Vec::new();

    for element in doc.elements() {
        let Some(color) = paint(doc, element) else {
            if strip_metadata(doc, element, config) {
                warn!(?element, "Removed annotation metadata from unpainted element");
            }
            continue;
        };

        let existing = doc.attr(element, &config.id_attribute).map(str::to_string);
        let id = match existing {
            Some(id) if !id.is_empty() && !seen.contains(&id) => id,
            existing => {
                if existing.is_some() {
                    debug!(?element, "Duplicate annotation id, assigning a new one");
                }
                let id = ctx.ids.new_id();
                doc.set_attr(element, &config.id_attribute, &id);
                id
            }
        };
        seen.insert(id.clone());

        let timestamp = match doc
            .attr(element, &config.timestamp_attribute)
            .and_then(parse_timestamp)
        {
            Some(timestamp) => timestamp,
            None => {
                let now = ctx.clock.now();
                doc.set_attr(element, &config.timestamp_attribute, &format_timestamp(&now));
                now
            }
        };

        let comment = doc
            .attr(element, &config.comment_attribute)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        annotations.push(Annotation {
            id,
            text: index.element_text(doc, element),
            color,
            timestamp,
            comment,
        });
    }

    annotations
}

/// First element carrying the annotation id
pub fn find_element(doc: &Document, id: &str, config: &AnchorConfig) -> Option<NodeId> {
    doc.elements()
        .into_iter()
        .find(|element| doc.attr(*element, &config.id_attribute) == Some(id))
}

/// Set or clear an annotation's comment.
///
/// Blank comments clear the attribute. Returns `false` when no element
/// carries the id.
pub fn update_comment(doc: &mut Document, id: &str, comment: &str, config: &AnchorConfig) -> bool {
    let Some(element) = find_element(doc, id, config) else {
        debug!(id, "Comment update for missing annotation ignored");
        return false;
    };

    if comment.trim().is_empty() {
        doc.remove_attr(element, &config.comment_attribute);
    } else {
        doc.set_attr(element, &config.comment_attribute, comment);
    }
    true
}

/// Remove an annotation's paint and metadata. Returns `false` if absent.
pub fn delete_annotation(doc: &mut Document, id: &str, config: &AnchorConfig) -> bool {
    let targets: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|element| doc.attr(*element, &config.id_attribute) == Some(id))
        .collect();

    for element in &targets {
        clear_footprint(doc, *element, config);
    }
    !targets.is_empty()
}

/// Remove every annotation from the document. Returns how many elements were cleared.
pub fn clear_all(doc: &mut Document, config: &AnchorConfig) -> usize {
    let targets: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|element| {
            paint(doc, *element).is_some() || doc.attr(*element, &config.id_attribute).is_some()
        })
        .collect();

    for element in &targets {
        clear_footprint(doc, *element, config);
    }
    targets.len()
}

/// Strip metadata from every unpainted element. Returns how many were healed.
pub fn heal_footprints(doc: &mut Document, config: &AnchorConfig) -> usize {
    doc.elements()
        .into_iter()
        .filter(|element| paint(doc, *element).is_none())
        .collect::<Vec<_>>()
        .into_iter()
        .filter(|element| strip_metadata(doc, *element, config))
        .count()
}

/// Remove paint and metadata together; bare spans left behind are unwrapped
pub fn clear_footprint(doc: &mut Document, element: NodeId, config: &AnchorConfig) {
    doc.remove_style_property(element, "background-color");
    if let Some(shorthand) = doc.style_property(element, "background") {
        let rest = strip_shorthand_color(&shorthand);
        if rest.is_empty() {
            doc.remove_style_property(element, "background");
        } else {
            doc.set_style_property(element, "background", &rest);
        }
    }
    strip_metadata(doc, element, config);
    if doc.tag_name(element) == Some("span") && !doc.has_attributes(element) {
        doc.unwrap(element);
    }
}

/// Remove id, timestamp and comment attributes. Returns whether any existed.
pub fn strip_metadata(doc: &mut Document, element: NodeId, config: &AnchorConfig) -> bool {
    let mut removed = false;
    for name in metadata_attributes(config) {
        removed |= doc.remove_attr(element, name);
    }
    removed
}

/// Names of the id, timestamp and comment attributes
pub fn metadata_attributes(config: &AnchorConfig) -> [&str; 3] {
    [
        config.id_attribute.as_str(),
        config.timestamp_attribute.as_str(),
        config.comment_attribute.as_str(),
    ]
}
