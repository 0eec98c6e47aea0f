//! Core shared types for jclean.
//!
//! This crate is intentionally small: source locations, a line index over an
//! immutable source snapshot, and text edits with their normalization rules.

mod edit;
mod text;

pub use edit::{apply_text_edits, normalize_text_edits, EditBatch, EditConflict, EditError, TextEdit};
pub use text::{offset_size, LineIndex, SourceText, TextRange, TextRangeExt, TextSize};
