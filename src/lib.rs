//! Marginalia Library
//!
//! HTML highlighting with portable, plain-text annotations.
//!
//! # Modules
//!
//! - `html`: In-memory document tree, sanitizing, rendered-text search
//! - `annotations`: Annotation types, document scanning and highlight painting
//! - `anchor`: Re-anchoring imported annotations into a live document
//! - `codec`: Annotation file export and import
//! - `session`: A loaded document with its user-facing state
//!
//! The server binary in main.rs exposes these over HTTP.

pub mod anchor;
pub mod annotations;
pub mod codec;
pub mod config;
pub mod error;
pub mod html;
pub mod routes;
pub mod session;
pub mod source;
pub mod state;
