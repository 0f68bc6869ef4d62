//! Re-anchoring engine
//!
//! Persisted annotations carry only their text, so importing one means
//! finding that text again in the live document, highlighting it and then
//! restoring the annotation's original id, timestamp and comment onto the
//! freshly painted elements.
//!
//! A highlight may paint several elements at once, and existing highlights
//! may share its color. The new elements are therefore painted with a
//! temporary marker color no other element uses, found by that color, and
//! only then repainted with the annotation's own color. The id, timestamp
//! and comment go on the first of them only; later fragments become
//! annotations of their own on the next scan.
//!
//! Records are processed strictly in order. Each match advances a shared
//! [`SearchCursor`], so repeated text is claimed occurrence by occurrence.

mod locate;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotations::scanner::{find_element, paint};
use crate::annotations::types::format_timestamp;
use crate::annotations::{apply_highlight, Annotation, ImportRecord};
use crate::html::{Document, TextIndex, TextRange};
use crate::source::{Context, IdSource};

pub use locate::{locate, MatchTier, SearchCursor};

/// Result of re-anchoring one annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "tier", rename_all = "camelCase")]
pub enum AnchorOutcome {
    /// Located and highlighted
    Found(MatchTier),
    /// An element already carries the annotation's id
    AlreadyAnchored,
    /// No tier matched, or the record was invalid
    NotFound,
}

impl AnchorOutcome {
    /// Whether the annotation is present in the document afterwards
    pub fn is_imported(&self) -> bool {
        !matches!(self, AnchorOutcome::NotFound)
    }
}

/// Result of importing a batch of records
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Records present in the document afterwards
    pub imported: usize,
    /// Records in the batch
    pub total: usize,
    /// Per-record outcomes, in batch order
    pub outcomes: Vec<AnchorOutcome>,
    /// Ids of records that could not be anchored
    pub failed_annotations: Vec<String>,
}

/// Locate one annotation from the cursor onward and restore it
pub fn reanchor(
    doc: &mut Document,
    annotation: &Annotation,
    cursor: &mut SearchCursor,
    ctx: &mut Context<'_>,
) -> AnchorOutcome {
    let config = ctx.config;
    let index = TextIndex::build(doc);

    if let Some(element) = find_element(doc, &annotation.id, config) {
        if let Some(range) = index.element_range(doc, element) {
            cursor.advance_to(range.end);
        }
        debug!(id = %annotation.id, "Annotation already anchored");
        return AnchorOutcome::AlreadyAnchored;
    }

    let Some((range, tier)) = locate(&index, &annotation.text, *cursor, config) else {
        debug!(id = %annotation.id, cursor = cursor.position(), "Annotation text not found");
        return AnchorOutcome::NotFound;
    };

    doc.set_selection(range);
    let marker = pick_marker_color(doc, ctx.ids, config.marker_attempts);
    apply_highlight(doc, range, &marker, config);

    let timestamp = format_timestamp(&annotation.timestamp);
    let marked: Vec<_> = doc
        .elements()
        .into_iter()
        .filter(|element| paint(doc, *element).as_deref() == Some(marker.as_str()))
        .collect();

    if let Some(first) = marked.first().copied() {
        doc.set_attr(first, &config.id_attribute, &annotation.id);
        doc.set_attr(first, &config.timestamp_attribute, &timestamp);
        match &annotation.comment {
            Some(comment) => doc.set_attr(first, &config.comment_attribute, comment),
            None => {
                doc.remove_attr(first, &config.comment_attribute);
            }
        }
    }
    for element in &marked {
        doc.set_style_property(*element, "background-color", &annotation.color);
    }

    cursor.advance_to(range.end);
    doc.set_selection(TextRange::collapsed(range.end));

    debug!(
        id = %annotation.id,
        ?tier,
        elements = marked.len(),
        "Re-anchored annotation"
    );
    AnchorOutcome::Found(tier)
}

/// Re-anchor records in order from the start of the document.
///
/// Invalid records count as not found. The selection is cleared afterwards.
pub fn import_batch(
    doc: &mut Document,
    records: Vec<ImportRecord>,
    ctx: &mut Context<'_>,
) -> ImportSummary {
    let total = records.len();
    let mut cursor = SearchCursor::start();
    let mut outcomes = Vec::with_capacity(total);
    let mut failed_annotations = Vec::new();

    for record in records {
        let id = record.id.clone();
        let outcome = match record.into_annotation() {
            Ok(annotation) => reanchor(doc, &annotation, &mut cursor, ctx),
            Err(e) => {
                debug!(?id, error = %e, "Skipping invalid import record");
                AnchorOutcome::NotFound
            }
        };
        if !outcome.is_imported() {
            failed_annotations.extend(id);
        }
        outcomes.push(outcome);
    }

    doc.clear_selection();

    let imported = outcomes.iter().filter(|o| o.is_imported()).count();
    info!(imported, total, "Imported annotation batch");

    ImportSummary {
        imported,
        total,
        outcomes,
        failed_annotations,
    }
}

/// A random color no element is painted with.
///
/// Gives up after `attempts` draws and uses the last one.
fn pick_marker_color(doc: &Document, ids: &mut dyn IdSource, attempts: usize) -> String {
    let in_use: HashSet<String> = doc
        .elements()
        .into_iter()
        .filter_map(|element| paint(doc, element))
        .collect();

    let mut color = ids.marker_color();
    for _ in 1..attempts.max(1) {
        if !in_use.contains(&color) {
            return color;
        }
        color = ids.marker_color();
    }
    if in_use.contains(&color) {
        warn!(%color, "Marker color collides with existing paint");
    }
    color
}
