//! Ledger of comment rewrites.
//!
//! Comments are not tree nodes, so they get their own ledger. Its edits join
//! the pass batch last, and only as a whole: if any of them touches text a
//! code rule already rewrote, the ledger is dropped for this pass and the
//! comments are looked at again on the next one.

use jclean_ast::{Ast, CommentId, CommentKind, NodeId};
use jclean_core::{normalize_text_edits, EditBatch, SourceText, TextEdit, TextRange, TextRangeExt, TextSize};

use crate::refactorings::{line_indent, line_terminator_len};

#[derive(Debug, Default, Clone)]
pub struct CommentLedger {
    removals: Vec<CommentId>,
    replacements: Vec<(CommentId, String)>,
    block_to_javadoc: Vec<CommentId>,
    /// Line comments grouped by the node they document, in call order.
    line_groups: Vec<(NodeId, Vec<CommentId>)>,
}

impl CommentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
            && self.replacements.is_empty()
            && self.block_to_javadoc.is_empty()
            && self.line_groups.is_empty()
    }

    pub fn remove(&mut self, comment: CommentId) {
        if !self.removals.contains(&comment) {
            self.removals.push(comment);
        }
    }

    pub fn replace(&mut self, comment: CommentId, text: impl Into<String>) {
        let text = text.into();
        match self.replacements.iter_mut().find(|(id, _)| *id == comment) {
            Some(entry) => entry.1 = text,
            None => self.replacements.push((comment, text)),
        }
    }

    pub fn to_javadoc(&mut self, block: CommentId) {
        if !self.block_to_javadoc.contains(&block) {
            self.block_to_javadoc.push(block);
        }
    }

    /// Adds `line` to the Javadoc group documenting `anchor`.
    pub fn to_javadoc_from_lines(&mut self, line: CommentId, anchor: NodeId) {
        match self.line_groups.iter_mut().find(|(a, _)| *a == anchor) {
            Some((_, group)) => {
                if !group.contains(&line) {
                    group.push(line);
                }
            }
            None => self.line_groups.push((anchor, vec![line])),
        }
    }

    /// Folds the intents of a single visit into the pass ledger.
    pub fn merge(&mut self, other: CommentLedger) {
        for comment in other.removals {
            self.remove(comment);
        }
        for (comment, text) in other.replacements {
            self.replace(comment, text);
        }
        for comment in other.block_to_javadoc {
            self.to_javadoc(comment);
        }
        for (anchor, group) in other.line_groups {
            for line in group {
                self.to_javadoc_from_lines(line, anchor);
            }
        }
    }

    /// Whether some intent already targets `comment`.
    pub fn is_claimed(&self, comment: CommentId) -> bool {
        self.removals.contains(&comment)
            || self.block_to_javadoc.contains(&comment)
            || self.replacements.iter().any(|(id, _)| *id == comment)
            || self.line_groups.iter().any(|(_, g)| g.contains(&comment))
    }

    pub fn synthesize(&self, ast: &Ast, source: &SourceText) -> Vec<TextEdit> {
        let mut edits = Vec::new();
        for comment in &self.removals {
            let range = chomp_comment(source, ast.comment(*comment).range);
            edits.push(TextEdit::delete(range));
        }
        for (comment, text) in &self.replacements {
            edits.push(TextEdit::replace(ast.comment(*comment).range, text.clone()));
        }
        for comment in &self.block_to_javadoc {
            let comment = ast.comment(*comment);
            if comment.kind == CommentKind::Block {
                edits.push(TextEdit::insert(comment.range.start() + TextSize::from(2), "*"));
            }
        }
        for (anchor, group) in &self.line_groups {
            let comments: Vec<TextRange> = group
                .iter()
                .map(|id| ast.comment(*id))
                .filter(|c| c.kind == CommentKind::Line)
                .map(|c| c.range)
                .collect();
            match comments.as_slice() {
                [] => {}
                [single] => single_line(ast, source, *anchor, *single, &mut edits),
                _ => line_series(ast, source, *anchor, &comments, &mut edits),
            }
        }
        edits
    }

    /// Appends the synthesized edits to `batch` if none collides with it.
    ///
    /// Returns whether the edits were taken.
    pub fn append_to(&self, ast: &Ast, source: &SourceText, batch: &mut EditBatch) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut edits = self.synthesize(ast, source);
        if let Err(err) = normalize_text_edits(source.as_str(), &mut edits) {
            tracing::debug!(target: "jclean.comments", %err, "comment edits collide with each other; deferred");
            return false;
        }
        if let Some(edit) = edits.iter().find(|e| batch.overlaps_any(e.range)) {
            tracing::debug!(
                target: "jclean.comments",
                start = edit.range.start_offset(),
                end = edit.range.end_offset(),
                "comment edits overlap code edits; deferred to next pass"
            );
            return false;
        }
        batch.try_extend(edits).is_ok()
    }
}

/// Widens a comment range over the blanks before it and the blanks plus first
/// line terminator after it. Code sharing the line keeps its indentation and
/// its line terminator.
fn chomp_comment(source: &SourceText, range: TextRange) -> TextRange {
    let bytes = source.as_str().as_bytes();
    let mut start = range.start_offset();
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    if start > 0 && !matches!(bytes[start - 1], b'\n' | b'\r') {
        return TextRange::from_offsets(start, range.end_offset());
    }

    let mut end = range.end_offset();
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    let terminator = line_terminator_len(bytes, end);
    if terminator == 0 && end < bytes.len() {
        return TextRange::from_offsets(range.start_offset(), end);
    }
    TextRange::from_offsets(start, end + terminator)
}

fn body_of(source: &SourceText, comment: TextRange) -> &str {
    &source.slice(comment)[2..]
}

fn escape_terminators(body: &str) -> String {
    body.replace("*/", "* /")
}

/// Start of the blank run directly before `offset` on its line.
fn blank_run_start(source: &SourceText, offset: usize) -> usize {
    let bytes = source.as_str().as_bytes();
    let mut start = offset;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    start
}

fn anchor_indent<'s>(ast: &Ast, source: &'s SourceText, anchor: NodeId) -> &'s str {
    line_indent(source, ast.range(anchor).start_offset())
}

fn single_line(
    ast: &Ast,
    source: &SourceText,
    anchor: NodeId,
    comment: TextRange,
    edits: &mut Vec<TextEdit>,
) {
    let body = body_of(source, comment);
    let anchor_start = ast.range(anchor).start_offset();

    if comment.end_offset() <= anchor_start {
        let opener = if body.starts_with(|c: char| !c.is_whitespace()) {
            "/** "
        } else {
            "/**"
        };
        edits.push(TextEdit::replace(TextRange::from_len(comment.start_offset(), 2), opener));
        for (idx, _) in body.match_indices("*/") {
            let at = comment.start_offset() + 2 + idx;
            edits.push(TextEdit::replace(TextRange::from_len(at, 2), "* /"));
        }
        let closer = if body.ends_with(char::is_whitespace) || body.is_empty() {
            "*/"
        } else {
            " */"
        };
        edits.push(TextEdit::insert(comment.end(), closer));
        return;
    }

    let sep = source.line_separator();
    let indent = anchor_indent(ast, source, anchor);
    let text = escape_terminators(body.trim());
    edits.push(TextEdit::insert(
        ast.range(anchor).start(),
        format!("/** {text} */{sep}{indent}"),
    ));
    edits.push(TextEdit::delete(TextRange::from_offsets(
        blank_run_start(source, comment.start_offset()),
        comment.end_offset(),
    )));
}

fn line_series(
    ast: &Ast,
    source: &SourceText,
    anchor: NodeId,
    comments: &[TextRange],
    edits: &mut Vec<TextEdit>,
) {
    let anchor_start = ast.range(anchor).start_offset();
    let sep = source.line_separator();
    let indent = anchor_indent(ast, source, anchor);

    let (before, after): (Vec<TextRange>, Vec<TextRange>) =
        comments.iter().partition(|c| c.start_offset() <= anchor_start);
    let Some(last_before) = before.last().copied() else {
        tracing::warn!(
            target: "jclean.comments",
            offset = anchor_start,
            "line comments that all follow their declaration are left alone"
        );
        return;
    };

    for (i, comment) in before.iter().enumerate() {
        let body = body_of(source, *comment);
        let space = if body.starts_with(|c: char| !c.is_whitespace()) {
            " "
        } else {
            ""
        };
        let prefix = if i == 0 {
            format!("/**{sep}{indent} *{space}")
        } else {
            format!(" *{space}")
        };
        edits.push(TextEdit::replace(TextRange::from_len(comment.start_offset(), 2), prefix));
        for (idx, _) in body.match_indices("*/") {
            let at = comment.start_offset() + 2 + idx;
            edits.push(TextEdit::replace(TextRange::from_len(at, 2), "* /"));
        }
    }

    let mut tail = String::new();
    for comment in &after {
        let body = escape_terminators(body_of(source, *comment).trim_end());
        let space = if body.starts_with(|c: char| !c.is_whitespace()) {
            " "
        } else {
            ""
        };
        tail.push_str(&format!("{sep}{indent} *{space}{body}"));
        edits.push(TextEdit::delete(TextRange::from_offsets(
            blank_run_start(source, comment.start_offset()),
            comment.end_offset(),
        )));
    }
    tail.push_str(&format!("{sep}{indent} */"));
    edits.push(TextEdit::insert(last_before.end(), tail));
}
