//! Export/import codec for annotation files

use std::path::Path;

use serde_json::Value;

use crate::annotations::scanner::find_element;
use crate::annotations::{Annotation, AnnotationFile, ImportRecord};
use crate::config::AnchorConfig;
use crate::html::Document;
use crate::source::Clock;

/// Errors reading an annotation file
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Annotation file has no \"annotations\" array")]
    MissingAnnotations,
}

/// Build an export of `annotations` in document order.
///
/// Annotations whose element is gone keep their position in the list.
pub fn serialize(
    doc: &Document,
    file_name: Option<&str>,
    annotations: &[Annotation],
    clock: &dyn Clock,
    config: &AnchorConfig,
) -> AnnotationFile {
    let anchored: Vec<_> = annotations
        .iter()
        .enumerate()
        .filter_map(|(slot, annotation)| {
            find_element(doc, &annotation.id, config).map(|element| (slot, element))
        })
        .collect();

    let mut sorted = anchored.clone();
    sorted.sort_by(|a, b| doc.compare_position(a.1, b.1));

    let mut ordered = annotations.to_vec();
    for ((slot, _), (source, _)) in anchored.iter().zip(&sorted) {
        ordered[*slot] = annotations[*source].clone();
    }

    AnnotationFile {
        source_file: file_name.map(str::to_string),
        exported_at: clock.now(),
        annotations: ordered,
    }
}

/// Pretty JSON with two-space indentation
pub fn to_json_pretty(file: &AnnotationFile) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(file)?)
}

/// Parse an annotation file into import records.
///
/// The file must be a JSON object with an `annotations` array. Entries that
/// are not objects or have mistyped fields become empty records, which fail
/// validation later and count as not found.
pub fn deserialize(json: &str) -> Result<Vec<ImportRecord>, CodecError> {
    let value: Value = serde_json::from_str(json)?;
    let entries = value
        .get("annotations")
        .and_then(Value::as_array)
        .ok_or(CodecError::MissingAnnotations)?;

    Ok(entries
        .iter()
        .map(|entry| serde_json::from_value(entry.clone()).unwrap_or_default())
        .collect())
}

/// Download name for an export: `<stem>-annotations.json`
pub fn export_file_name(source: Option<&str>) -> String {
    source
        .map(Path::new)
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{}-annotations.json", stem))
        .unwrap_or_else(|| "annotations.json".to_string())
}
