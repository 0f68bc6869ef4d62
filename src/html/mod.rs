//! HTML processing module
//!
//! Provides the document model the annotation engine works against:
//! - Sanitizing untrusted input before load
//! - An in-memory, mutable document tree
//! - Rendered-text indexing and the text-search primitive
//! - Text normalization

pub mod dom;
pub mod sanitize;
pub mod search;
pub mod text;

pub use dom::{Document, DomError, NodeId, NodeKind};
pub use sanitize::sanitize_html;
pub use search::{TextIndex, TextRange, TextSegment};
pub use text::normalize;

/// Sanitize and parse an HTML document
pub fn load_document(html: &str) -> Result<Document, DomError> {
    let clean = sanitize_html(html)?;
    Document::parse(&clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_keeps_comparison_text() {
        let doc = load_document(
            "<html><body><p>If 5 < 6 then AT&T wins.</p><p>Next para</p></body></html>",
        )
        .unwrap();

        assert_eq!(
            TextIndex::build(&doc).as_string(),
            "If 5 < 6 then AT&T wins. Next para"
        );
    }
}
