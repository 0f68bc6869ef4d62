//! Filtering of the annotation projection for the sidebar search

use serde::Deserialize;

use super::color::normalize_hex;
use super::types::Annotation;

/// Query filters for listing annotations
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AnnotationQuery {
    /// Case-insensitive substring of the annotation text
    pub q: Option<String>,
    /// Only annotations painted with this color
    pub color: Option<String>,
}

impl AnnotationQuery {
    pub fn text(query: &str) -> Self {
        Self {
            q: Some(query.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        let text_matches = match self.q.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => annotation
                .text
                .to_lowercase()
                .contains(&query.to_lowercase()),
            _ => true,
        };
        let color_matches = match self.color.as_deref() {
            Some(color) if !color.trim().is_empty() => {
                normalize_hex(color).as_deref() == Some(annotation.color.as_str())
            }
            _ => true,
        };
        text_matches && color_matches
    }
}

/// Annotations matching the query, in their original order
pub fn filter_annotations(annotations: &[Annotation], query: &AnnotationQuery) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|annotation| query.matches(annotation))
        .cloned()
        .collect()
}
