//! Per-visit ledger of structural edit intents and their synthesis into text
//! edits.
//!
//! Rules never touch the source directly. They record what should happen to a
//! node (remove it, replace it, insert a statement next to it, move it) and the
//! ledger turns those intents into [`TextEdit`]s that respect the surrounding
//! layout: removed statements take their line with them, inserted statements
//! land on their own line at the anchor's indentation.

use jclean_ast::{Ast, NodeId, NodeKind};
use jclean_core::{normalize_text_edits, EditError, SourceText, TextEdit, TextRange, TextRangeExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Text(String),
    /// Statements placed one per line at the target's indentation.
    Statements(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Intent {
    Remove {
        node: NodeId,
        range: TextRange,
    },
    Replace {
        node: NodeId,
        range: TextRange,
        with: Replacement,
    },
    InsertBefore {
        anchor: NodeId,
        range: TextRange,
        text: String,
    },
    InsertAfter {
        anchor: NodeId,
        range: TextRange,
        text: String,
    },
    Move {
        node: NodeId,
        range: TextRange,
    },
}

/// Intents recorded by one rule visit.
///
/// Locations are captured when an intent is recorded; the tree is read-only for
/// the whole pass so they never go stale before [`Refactorings::synthesize`].
#[derive(Debug, Default, Clone)]
pub struct Refactorings {
    intents: Vec<Intent>,
}

impl Refactorings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn remove(&mut self, node: NodeId, range: TextRange) {
        self.intents.push(Intent::Remove { node, range });
    }

    pub fn replace(&mut self, node: NodeId, range: TextRange, with: Replacement) {
        self.intents.push(Intent::Replace { node, range, with });
    }

    pub fn insert_before(&mut self, anchor: NodeId, range: TextRange, text: String) {
        self.intents.push(Intent::InsertBefore {
            anchor,
            range,
            text,
        });
    }

    pub fn insert_after(&mut self, anchor: NodeId, range: TextRange, text: String) {
        self.intents.push(Intent::InsertAfter {
            anchor,
            range,
            text,
        });
    }

    /// Marks `node` as moved; its new text is inserted by a separate intent.
    pub fn move_node(&mut self, node: NodeId, range: TextRange) {
        self.intents.push(Intent::Move { node, range });
    }

    /// Nodes the intents target, in recording order.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.intents.iter().map(|intent| match intent {
            Intent::Remove { node, .. }
            | Intent::Replace { node, .. }
            | Intent::Move { node, .. } => *node,
            Intent::InsertBefore { anchor, .. } | Intent::InsertAfter { anchor, .. } => *anchor,
        })
    }

    /// Converts the intents into normalized, non-overlapping edits.
    pub fn synthesize(&self, ast: &Ast, source: &SourceText) -> Result<Vec<TextEdit>, EditError> {
        let sep = source.line_separator();
        let rewritten: Vec<TextRange> = self
            .intents
            .iter()
            .filter_map(|intent| match intent {
                Intent::Remove { range, .. } | Intent::Replace { range, .. } => Some(*range),
                _ => None,
            })
            .collect();

        let mut edits = Vec::with_capacity(self.intents.len());
        for intent in &self.intents {
            match intent {
                Intent::Remove { node, range } => edits.push(removal(ast, source, *node, *range)),
                Intent::Replace { range, with, .. } => {
                    let text = match with {
                        Replacement::Text(text) => text.clone(),
                        Replacement::Statements(statements) => {
                            let glue = format!("{sep}{}", line_indent(source, range.start_offset()));
                            statements.join(&glue)
                        }
                    };
                    edits.push(TextEdit::replace(*range, text));
                }
                Intent::InsertBefore { range, text, .. } => {
                    let indent = source.indent_of(range.start_offset());
                    let text = if indent.is_empty() && range.start_offset() != 0 {
                        format!("{text} ")
                    } else {
                        format!("{text}{sep}{indent}")
                    };
                    edits.push(TextEdit::insert(range.start(), text));
                }
                Intent::InsertAfter { range, text, .. } => {
                    let indent = line_indent(source, range.start_offset());
                    edits.push(TextEdit::insert(range.end(), format!("{sep}{indent}{text}")));
                }
                Intent::Move { node, range } => {
                    if rewritten.iter().any(|r| r.contains_range(*range)) {
                        continue;
                    }
                    edits.push(removal(ast, source, *node, *range));
                }
            }
        }

        merge_adjacent_deletions(source, &mut edits);
        normalize_text_edits(source.as_str(), &mut edits)?;
        Ok(edits)
    }
}

/// Text of `node` with `edits` (all inside the node) applied.
pub fn render(
    ast: &Ast,
    source: &SourceText,
    node: NodeId,
    edits: &[TextEdit],
) -> Result<String, EditError> {
    let range = ast.range(node);
    let text = source.slice(range);
    let mut local = Vec::with_capacity(edits.len());
    for edit in edits {
        if !range.contains_range(edit.range) {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len: range.end_offset(),
            });
        }
        local.push(TextEdit::new(edit.range - range.start(), edit.replacement.clone()));
    }
    jclean_core::apply_text_edits(text, &local)
}

/// Leading whitespace of the line holding `offset`, whatever precedes `offset`.
pub fn line_indent(source: &SourceText, offset: usize) -> &str {
    let line = source.indent_range(offset);
    let text = source.slice(line);
    let end = text
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(text.len());
    &text[..end]
}

fn removal(ast: &Ast, source: &SourceText, node: NodeId, range: TextRange) -> TextEdit {
    if let Some(parent) = ast.parent(node) {
        match ast.kind(parent) {
            NodeKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } if *else_branch == node => {
                let from = ast.range(*then_branch).end_offset();
                return TextEdit::delete(TextRange::from_offsets(from, range.end_offset()));
            }
            NodeKind::VarFragment {
                name,
                initializer: Some(init),
            } if *init == node => {
                let from = ast.range(*name).end_offset();
                return TextEdit::delete(TextRange::from_offsets(from, range.end_offset()));
            }
            NodeKind::Block { .. }
            | NodeKind::TypeDecl { .. }
            | NodeKind::CompilationUnit { .. } => {}
            // A body slot cannot be left empty.
            _ if ast.is_statement(node) => return TextEdit::replace(range, "{}"),
            _ => {}
        }
    }

    let kind = ast.kind(node);
    if kind.is_statement()
        || kind.is_body_declaration()
        || matches!(kind, NodeKind::ImportDecl { .. })
    {
        TextEdit::delete(chomp_statement(source, range))
    } else {
        TextEdit::delete(range)
    }
}

/// Widens a removed statement's range over the whitespace it leaves behind.
///
/// A line left blank goes entirely, terminator included. Otherwise the blanks
/// on the side facing the remaining code are taken.
pub(crate) fn chomp_statement(source: &SourceText, range: TextRange) -> TextRange {
    let bytes = source.as_str().as_bytes();
    let mut start = range.start_offset();
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    let mut end = range.end_offset();
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    let at_line_start = start == 0 || matches!(bytes[start - 1], b'\n' | b'\r');
    let at_line_end = end == bytes.len() || matches!(bytes[end], b'\n' | b'\r');

    match (at_line_start, at_line_end) {
        (true, true) => {
            end += line_terminator_len(bytes, end);
            TextRange::from_offsets(start, end)
        }
        (_, false) => TextRange::from_offsets(range.start_offset(), end),
        (false, true) => TextRange::from_offsets(start, end),
    }
}

pub(crate) fn line_terminator_len(bytes: &[u8], at: usize) -> usize {
    match (bytes.get(at), bytes.get(at + 1)) {
        (Some(b'\r'), Some(b'\n')) => 2,
        (Some(b'\r' | b'\n'), _) => 1,
        _ => 0,
    }
}

/// Neighbouring statement removals may claim the same blanks; fuse them.
fn merge_adjacent_deletions(source: &SourceText, edits: &mut Vec<TextEdit>) {
    edits.sort_by_key(|e| (e.range.start(), e.range.end()));
    let mut merged: Vec<TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits.drain(..) {
        if let Some(last) = merged.last_mut() {
            let both_deletions = last.replacement.is_empty()
                && edit.replacement.is_empty()
                && !last.range.is_empty()
                && !edit.range.is_empty();
            if both_deletions && edit.range.start() < last.range.end() {
                last.range = chomp_statement(source, last.range.cover(edit.range));
                continue;
            }
        }
        merged.push(edit);
    }
    *edits = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_core::apply_text_edits;
    use jclean_test_utils::{find_node, parse_fixture};
    use pretty_assertions::assert_eq;

    fn run(source: &str, record: impl FnOnce(&Ast, &mut Refactorings)) -> String {
        let unit = parse_fixture(source);
        let text = SourceText::new(source);
        let mut refactorings = Refactorings::new();
        record(&unit.ast, &mut refactorings);
        let edits = refactorings
            .synthesize(&unit.ast, &text)
            .expect("edits should synthesize");
        apply_text_edits(source, &edits).expect("edits should apply")
    }

    const METHOD: &str = "class A {\n    void m() {\n        a();\n        b(); // keep\n        c(); d();\n    }\n}\n";

    #[test]
    fn removing_a_statement_takes_its_line() {
        let out = run(METHOD, |ast, r| {
            let stmt = find_node(ast, METHOD, "a();");
            r.remove(stmt, ast.range(stmt));
        });
        assert_eq!(
            out,
            "class A {\n    void m() {\n        b(); // keep\n        c(); d();\n    }\n}\n"
        );
    }

    #[test]
    fn removal_keeps_code_sharing_the_line() {
        let out = run(METHOD, |ast, r| {
            let b = find_node(ast, METHOD, "b();");
            let d = find_node(ast, METHOD, "d();");
            r.remove(b, ast.range(b));
            r.remove(d, ast.range(d));
        });
        assert_eq!(
            out,
            "class A {\n    void m() {\n        a();\n        // keep\n        c();\n    }\n}\n"
        );
    }

    #[test]
    fn adjacent_removals_on_one_line_merge() {
        let out = run(METHOD, |ast, r| {
            let c = find_node(ast, METHOD, "c();");
            let d = find_node(ast, METHOD, "d();");
            r.remove(c, ast.range(c));
            r.remove(d, ast.range(d));
        });
        assert_eq!(
            out,
            "class A {\n    void m() {\n        a();\n        b(); // keep\n    }\n}\n"
        );
    }

    #[test]
    fn inserts_land_on_their_own_line() {
        let out = run(METHOD, |ast, r| {
            let a = find_node(ast, METHOD, "a();");
            r.insert_before(a, ast.range(a), "x();".into());
            r.insert_after(a, ast.range(a), "y();".into());
            r.insert_after(a, ast.range(a), "z();".into());
        });
        assert_eq!(
            out,
            "class A {\n    void m() {\n        x();\n        a();\n        y();\n        z();\n        b(); // keep\n        c(); d();\n    }\n}\n"
        );
    }

    #[test]
    fn else_branch_and_initializer_removal() {
        let source = "class A {\n    int f = 0;\n    void m(boolean c) {\n        if (c) {\n            a();\n        } else {\n        }\n    }\n}\n";
        let out = run(source, |ast, r| {
            let init = find_node(ast, source, "0");
            r.remove(init, ast.range(init));
            let NodeKind::If {
                else_branch: Some(else_branch),
                ..
            } = ast.kind(find_node(ast, source, "if (c) {\n            a();\n        } else {\n        }"))
            else {
                panic!("expected an if with an else");
            };
            r.remove(*else_branch, ast.range(*else_branch));
        });
        assert_eq!(
            out,
            "class A {\n    int f;\n    void m(boolean c) {\n        if (c) {\n            a();\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn moved_node_inside_a_replacement_is_not_deleted_twice() {
        let source = "class A {\n    void m() {\n        { a(); }\n    }\n}\n";
        let out = run(source, |ast, r| {
            let block = find_node(ast, source, "{ a(); }");
            let a = find_node(ast, source, "a();");
            r.replace(block, ast.range(block), Replacement::Text("a();".into()));
            r.move_node(a, ast.range(a));
        });
        assert_eq!(out, "class A {\n    void m() {\n        a();\n    }\n}\n");
    }

    #[test]
    fn statement_list_replacement_uses_target_indentation() {
        let out = run(METHOD, |ast, r| {
            let a = find_node(ast, METHOD, "a();");
            r.replace(
                a,
                ast.range(a),
                Replacement::Statements(vec!["p();".into(), "q();".into()]),
            );
        });
        assert!(out.contains("        p();\n        q();\n        b();"), "{out}");
    }

    #[test]
    fn render_applies_inner_edits() {
        let unit = parse_fixture(METHOD);
        let text = SourceText::new(METHOD);
        let stmt = find_node(&unit.ast, METHOD, "a();");
        let name = find_node(&unit.ast, METHOD, "a");
        let rendered = render(
            &unit.ast,
            &text,
            stmt,
            &[TextEdit::replace(unit.ast.range(name), "other")],
        )
        .expect("render");
        assert_eq!(rendered, "other();");
    }
}
