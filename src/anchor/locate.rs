//! Tiered text location
//!
//! Stored annotation text is looked up in the rendered text with three
//! increasingly lenient strategies. The first one that hits wins.

use serde::Serialize;

use crate::config::AnchorConfig;
use crate::html::{normalize, TextIndex, TextRange};

/// Which strategy located an annotation's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// The stored text verbatim
    Exact,
    /// The stored text with whitespace collapsed
    Normalized,
    /// The text before a trailing truncation marker
    Truncated,
}

/// Search position that only moves forward during a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCursor(usize);

impl SearchCursor {
    pub fn start() -> Self {
        Self(0)
    }

    pub fn position(&self) -> usize {
        self.0
    }

    /// Move to `position` unless the cursor is already past it
    pub fn advance_to(&mut self, position: usize) {
        self.0 = self.0.max(position);
    }
}

/// Find `text` at or after the cursor
pub fn locate(
    index: &TextIndex,
    text: &str,
    cursor: SearchCursor,
    config: &AnchorConfig,
) -> Option<(TextRange, MatchTier)> {
    let from = cursor.position();
    let case_sensitive = config.case_sensitive;

    if let Some(range) = index.find(text, from, case_sensitive) {
        return Some((range, MatchTier::Exact));
    }

    let normalized = normalize(text);
    if normalized != text {
        if let Some(range) = index.find(&normalized, from, case_sensitive) {
            return Some((range, MatchTier::Normalized));
        }
    }

    let prefix = truncated_prefix(text, config)?;
    index
        .find(prefix, from, case_sensitive)
        .map(|range| (range, MatchTier::Truncated))
}

/// Text before the truncation marker, if it is long enough to be worth searching
fn truncated_prefix<'a>(text: &'a str, config: &AnchorConfig) -> Option<&'a str> {
    let prefix = text.strip_suffix(config.truncation_marker.as_str())?;
    (prefix.chars().count() > config.min_truncated_prefix).then_some(prefix)
}
