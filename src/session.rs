//! A loaded document and the user state around it
//!
//! Every mutating operation rescans the document, so [`DocumentSession::annotations`]
//! always reflects the current paint.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::anchor::{import_batch, ImportSummary};
use crate::annotations::color::normalize_hex;
use crate::annotations::{
    apply_highlight, clear_all, delete_annotation, filter_annotations, remove_highlight, scan,
    update_comment, Annotation, AnnotationFile, AnnotationQuery,
};
use crate::codec::{self, CodecError};
use crate::config::{AnchorConfig, Config};
use crate::html::{load_document, Document, DomError, TextIndex, TextRange};
use crate::source::{Clock, Context, IdSource, RandomIds, SystemClock};

/// A named highlight color offered to the user
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HighlightColor {
    pub name: &'static str,
    pub value: &'static str,
}

/// Colors offered for highlighting; the first is the default
pub const HIGHLIGHT_PALETTE: &[HighlightColor] = &[
    HighlightColor { name: "Yellow", value: "#ffff00" },
    HighlightColor { name: "Green", value: "#90ee90" },
    HighlightColor { name: "Blue", value: "#add8e6" },
    HighlightColor { name: "Pink", value: "#ffb6c1" },
    HighlightColor { name: "Orange", value: "#ffa500" },
];

/// What happened when a selection was released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SelectionRelease {
    /// Auto-highlight painted the selection
    Highlighted { elements: usize },
    /// The selection is kept for an explicit highlight action
    Pending { start: usize, end: usize },
    /// Nothing was selected
    Cleared,
}

pub struct DocumentSession {
    document: Document,
    file_name: Option<String>,
    color: String,
    auto_highlight: bool,
    annotations: Vec<Annotation>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdSource>,
    config: AnchorConfig,
    settle_delay: Duration,
}

impl DocumentSession {
    /// Sanitize and load a document with wall-clock time and random ids
    pub fn load(html: &str, file_name: Option<String>, config: &Config) -> Result<Self, DomError> {
        let document = load_document(html)?;
        Ok(Self::with_sources(
            document,
            file_name,
            config.anchor.clone(),
            config.session.settle_delay(),
            Arc::new(SystemClock),
            Box::new(RandomIds),
        ))
    }

    /// Wrap an already parsed document and run the initial scan
    pub fn with_sources(
        document: Document,
        file_name: Option<String>,
        config: AnchorConfig,
        settle_delay: Duration,
        clock: Arc<dyn Clock>,
        ids: Box<dyn IdSource>,
    ) -> Self {
        let mut session = Self {
            document,
            file_name,
            color: HIGHLIGHT_PALETTE[0].value.to_string(),
            auto_highlight: false,
            annotations: Vec::new(),
            clock,
            ids,
            config,
            settle_delay,
        };
        session.rescan();
        info!(
            file_name = ?session.file_name,
            annotations = session.annotations.len(),
            "Loaded document"
        );
        session
    }

    fn rescan(&mut self) {
        let mut ctx = Context {
            clock: self.clock.as_ref(),
            ids: self.ids.as_mut(),
            config: &self.config,
        };
        self.annotations = scan(&mut self.document, &mut ctx);
    }

    // ============================================
    // Accessors and settings
    // ============================================

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn filtered(&self, query: &AnnotationQuery) -> Vec<Annotation> {
        filter_annotations(&self.annotations, query)
    }

    pub fn html(&self) -> String {
        self.document.to_html()
    }

    pub fn rendered_text(&self) -> String {
        TextIndex::build(&self.document).as_string()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Set the current highlight color. Returns `false` for anything that is
    /// not an opaque color.
    pub fn set_color(&mut self, color: &str) -> bool {
        match normalize_hex(color) {
            Some(hex) => {
                self.color = hex;
                true
            }
            None => false,
        }
    }

    pub fn auto_highlight(&self) -> bool {
        self.auto_highlight
    }

    pub fn set_auto_highlight(&mut self, enabled: bool) {
        self.auto_highlight = enabled;
    }

    // ============================================
    // Selection and highlighting
    // ============================================

    pub fn select(&mut self, range: TextRange) {
        self.document.set_selection(range);
    }

    pub fn selection(&self) -> Option<TextRange> {
        self.document.selection()
    }

    /// Paint the selection with the current color
    pub fn highlight_selection(&mut self) -> usize {
        let color = self.color.clone();
        self.paint_selection(Some(&color))
    }

    /// Remove paint under the selection
    pub fn remove_selection_highlight(&mut self) -> usize {
        self.paint_selection(None)
    }

    pub fn highlight_range(&mut self, range: TextRange, color: Option<&str>) -> usize {
        self.select(range);
        let color = color.unwrap_or(&self.color).to_string();
        self.paint_selection(Some(&color))
    }

    pub fn remove_range(&mut self, range: TextRange) -> usize {
        self.select(range);
        self.paint_selection(None)
    }

    fn paint_selection(&mut self, color: Option<&str>) -> usize {
        let Some(range) = self.document.selection() else {
            return 0;
        };
        let changed = match color {
            Some(color) => apply_highlight(&mut self.document, range, color, &self.config),
            None => remove_highlight(&mut self.document, range, &self.config),
        };
        self.rescan();
        changed
    }

    /// React to the user releasing a selection.
    ///
    /// Waits for the selection to settle first. With auto-highlight on, a
    /// non-empty selection is painted at once; otherwise it is kept pending.
    pub async fn on_selection_released(&mut self) -> SelectionRelease {
        tokio::time::sleep(self.settle_delay).await;

        match self.document.selection() {
            Some(range) if !range.is_collapsed() => {
                if self.auto_highlight {
                    let elements = self.highlight_selection();
                    debug!(?range, elements, "Auto-highlighted selection");
                    SelectionRelease::Highlighted { elements }
                } else {
                    SelectionRelease::Pending {
                        start: range.start,
                        end: range.end,
                    }
                }
            }
            _ => {
                self.document.clear_selection();
                SelectionRelease::Cleared
            }
        }
    }

    // ============================================
    // Annotation management
    // ============================================

    pub fn update_comment(&mut self, id: &str, comment: &str) -> bool {
        let updated = update_comment(&mut self.document, id, comment, &self.config);
        self.rescan();
        updated
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let deleted = delete_annotation(&mut self.document, id, &self.config);
        self.rescan();
        deleted
    }

    pub fn clear_all(&mut self) -> usize {
        let cleared = clear_all(&mut self.document, &self.config);
        self.rescan();
        cleared
    }

    // ============================================
    // Export and import
    // ============================================

    pub fn export(&self) -> AnnotationFile {
        codec::serialize(
            &self.document,
            self.file_name.as_deref(),
            &self.annotations,
            self.clock.as_ref(),
            &self.config,
        )
    }

    pub fn export_file_name(&self) -> String {
        codec::export_file_name(self.file_name.as_deref())
    }

    /// Re-anchor an exported annotation file into this document.
    ///
    /// A malformed file is rejected before anything is touched.
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary, CodecError> {
        let records = codec::deserialize(json)?;
        let summary = {
            let mut ctx = Context {
                clock: self.clock.as_ref(),
                ids: self.ids.as_mut(),
                config: &self.config,
            };
            import_batch(&mut self.document, records, &mut ctx)
        };
        self.rescan();
        Ok(summary)
    }
}
