//! Text edit primitives and utilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TextRange, TextRangeExt, TextSize};

/// A concrete `(offset, length, replacement)` edit against one source snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn replace(range: TextRange, text: impl Into<String>) -> Self {
        Self::new(range, text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.range.start_offset()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.byte_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty() && self.replacement.is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("edit range {range:?} is out of bounds for text length {text_len}")]
    RangeOutOfBounds { range: TextRange, text_len: usize },
    #[error("offset {offset} is not a UTF-8 character boundary")]
    InvalidUtf8Boundary { offset: usize },
    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits { first: TextRange, second: TextRange },
}

/// Apply a list of edits to a text snapshot.
///
/// The function is deterministic: edits are first normalized and then applied
/// from the end of the text backwards.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut edits = edits.to_vec();
    normalize_text_edits(text, &mut edits)?;

    let mut out = text.to_string();
    for edit in edits.into_iter().rev() {
        out.replace_range(edit.range.start_offset()..edit.range.end_offset(), &edit.replacement);
    }
    Ok(out)
}

/// Sort edits and check for overlaps / out-of-bounds.
///
/// The sort is stable, so several insertions at one offset keep their
/// submission order and are concatenated into one edit.
pub fn normalize_text_edits(text: &str, edits: &mut Vec<TextEdit>) -> Result<(), EditError> {
    edits.retain(|e| !e.is_empty());
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));
    edits.dedup_by(|b, a| a.range == b.range && a.replacement == b.replacement && !a.range.is_empty());

    for edit in edits.iter() {
        if edit.range.end_offset() > text.len() {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len: text.len(),
            });
        }
        for offset in [edit.range.start_offset(), edit.range.end_offset()] {
            if !text.is_char_boundary(offset) {
                return Err(EditError::InvalidUtf8Boundary { offset });
            }
        }
    }

    let mut merged: Vec<TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits.drain(..) {
        if let Some(last) = merged.last_mut() {
            if last.range.is_empty() && edit.range.is_empty() && last.range.start() == edit.range.start() {
                last.replacement.push_str(&edit.replacement);
                continue;
            }
            if last.range.end() > edit.range.start() {
                return Err(EditError::OverlappingEdits {
                    first: last.range,
                    second: edit.range,
                });
            }
        }
        merged.push(edit);
    }
    *edits = merged;

    Ok(())
}

/// Returned when a group of edits competes with edits already queued.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("edit {incoming:?} overlaps queued edit {queued:?}")]
pub struct EditConflict {
    pub incoming: TextRange,
    pub queued: TextRange,
}

/// Accumulates the concrete edits of one pass.
///
/// Groups are accepted all-or-nothing: a group in which any edit overlaps an
/// already queued edit leaves the batch untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditBatch {
    edits: Vec<TextEdit>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    pub fn overlaps_any(&self, range: TextRange) -> bool {
        self.edits.iter().any(|e| e.range.overlaps(range))
    }

    /// Whether `range` lies inside a range that some queued edit rewrites.
    pub fn is_rewritten(&self, range: TextRange) -> bool {
        self.edits
            .iter()
            .any(|e| !e.range.is_empty() && e.range.contains_range(range))
    }

    pub fn try_extend(&mut self, incoming: Vec<TextEdit>) -> Result<(), EditConflict> {
        for edit in &incoming {
            if let Some(queued) = self.edits.iter().find(|q| q.range.overlaps(edit.range)) {
                return Err(EditConflict {
                    incoming: edit.range,
                    queued: queued.range,
                });
            }
        }
        self.edits.extend(incoming);
        Ok(())
    }

    /// Normalized, non-overlapping edits sorted by offset.
    pub fn into_edits(self, text: &str) -> Result<Vec<TextEdit>, EditError> {
        let mut edits = self.edits;
        normalize_text_edits(text, &mut edits)?;
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_multiple_edits_is_deterministic() {
        let text = "abcdef";
        let mut edits = vec![
            TextEdit::replace(TextRange::from_offsets(2, 4), "XX"),
            TextEdit::insert(TextSize::from(0), "!"),
            TextEdit::delete(TextRange::from_offsets(5, 6)),
        ];

        let out1 = apply_text_edits(text, &edits).unwrap();

        edits.reverse();
        let out2 = apply_text_edits(text, &edits).unwrap();

        assert_eq!(out1, out2);
        assert_eq!(out1, "!abXXe");
    }

    #[test]
    fn detect_overlapping_edits() {
        let text = "abcdef";
        let edits = vec![
            TextEdit::replace(TextRange::from_offsets(1, 4), "X"),
            TextEdit::replace(TextRange::from_offsets(3, 5), "Y"),
        ];

        assert!(matches!(
            apply_text_edits(text, &edits),
            Err(EditError::OverlappingEdits { .. })
        ));
    }

    #[test]
    fn inserts_at_same_offset_keep_submission_order() {
        let edits = vec![TextEdit::insert(TextSize::from(1), "1"), TextEdit::insert(TextSize::from(1), "2")];
        assert_eq!(apply_text_edits("ab", &edits).unwrap(), "a12b");
    }

    #[test]
    fn batch_rejects_conflicting_group_wholesale() {
        let mut batch = EditBatch::new();
        batch
            .try_extend(vec![TextEdit::replace(TextRange::from_offsets(0, 3), "x")])
            .unwrap();

        let err = batch
            .try_extend(vec![
                TextEdit::insert(TextSize::from(5), "ok"),
                TextEdit::delete(TextRange::from_offsets(2, 4)),
            ])
            .unwrap_err();
        assert_eq!(err.queued, TextRange::from_offsets(0, 3));
        assert_eq!(batch.len(), 1);
        assert!(batch.is_rewritten(TextRange::from_offsets(1, 2)));
    }
}
