//! Annotation module
//!
//! Annotations live on the document itself: a painted element is an
//! annotation, and its id, timestamp and comment are attributes on that
//! element. This module derives the annotation list from the document and
//! changes the document's paint.
//!
//! # Features
//!
//! - Paint parsing and `#rrggbb` normalization
//! - Scanning with identity stamping and self-healing of stale metadata
//! - Applying and removing highlights over rendered-text ranges
//! - Sidebar filtering

pub mod color;
pub mod filter;
pub mod highlight;
pub mod scanner;
pub mod types;

pub use filter::{filter_annotations, AnnotationQuery};
pub use highlight::{apply_highlight, remove_highlight};
pub use scanner::{clear_all, delete_annotation, find_element, scan, update_comment};
pub use types::{Annotation, AnnotationFile, ImportRecord, RecordError};
