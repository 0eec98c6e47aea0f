use std::collections::HashSet;

use jclean_ast::{Ast, CommentId, CommentKind, NodeId, NodeKind};
use jclean_core::{SourceText, TextRange, TextRangeExt};

use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};

/// Markers read by other tools; such comments keep their shape.
const TOOL_MARKERS: &[&str] = &["TODO", "FIXME", "NOSONAR", "NOPMD", "CHECKSTYLE"];

/// Removes empty comments and turns comments documenting a declaration into
/// Javadoc.
///
/// Works on the comment list as a whole, so it only visits the root.
pub struct CommentsRule;

impl CleanupRule for CommentsRule {
    fn id(&self) -> &'static str {
        "comments"
    }

    fn name(&self) -> &'static str {
        "Comments"
    }

    fn description(&self) -> &'static str {
        "Removes empty comments and converts declaration comments to Javadoc"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        if node != ctx.ast.root() {
            return Ok(Visit::SkipSubtree);
        }
        let scan = Scan::new(ctx.ast, ctx.source);
        let mut documented = HashSet::new();

        for id in ctx.ast.comment_ids() {
            let comment = ctx.ast.comment(id);
            if scan.is_empty(id) {
                ctx.comments.remove(id);
                continue;
            }
            if comment.kind == CommentKind::Line {
                continue;
            }
            let decl = scan
                .declaration_after(comment.range)
                .filter(|_| scan.starts_line(comment.range.start_offset()));
            if let Some(decl) = decl {
                documented.insert(decl);
                if comment.kind == CommentKind::Block && !scan.is_tool_marker(id) {
                    ctx.comments.to_javadoc(id);
                }
            }
        }

        let mut series: Vec<CommentId> = Vec::new();
        for id in ctx.ast.comment_ids() {
            let range = ctx.ast.comment(id).range;
            if !scan.is_own_line_comment(id) {
                series.clear();
                continue;
            }
            let continues = series
                .last()
                .is_some_and(|prev| scan.adjacent(ctx.ast.comment(*prev).range.end_offset(), range.start_offset()));
            if !continues {
                series.clear();
            }
            series.push(id);
            let Some(decl) = scan.declaration_after(range) else {
                continue;
            };
            if !series.iter().any(|line| scan.is_tool_marker(*line)) {
                for line in &series {
                    ctx.comments.to_javadoc_from_lines(*line, decl);
                }
            }
            series.clear();
        }

        for id in ctx.ast.comment_ids() {
            if !scan.is_trailing_line_comment(id) {
                continue;
            }
            let Some(field) = scan.field_before(ctx.ast.comment(id).range) else {
                continue;
            };
            if !documented.contains(&field) {
                ctx.comments.to_javadoc_from_lines(id, field);
            }
        }

        tracing::trace!(target: "jclean.rules", changed = !ctx.comments.is_empty(), "comments scanned");
        Ok(Visit::SkipSubtree)
    }
}

struct Scan<'a> {
    ast: &'a Ast,
    source: &'a SourceText,
    /// Body declarations in source order.
    declarations: Vec<NodeId>,
}

impl<'a> Scan<'a> {
    fn new(ast: &'a Ast, source: &'a SourceText) -> Self {
        let declarations = ast
            .preorder(ast.root())
            .into_iter()
            .filter(|node| ast.kind(*node).is_body_declaration())
            .collect();
        Self {
            ast,
            source,
            declarations,
        }
    }

    fn text(&self, id: CommentId) -> &'a str {
        self.source.slice(self.ast.comment(id).range)
    }

    /// The comment's content without its delimiters.
    fn body(&self, id: CommentId) -> &'a str {
        let text = self.text(id);
        match self.ast.comment(id).kind {
            CommentKind::Line => &text[2..],
            CommentKind::Block | CommentKind::Javadoc if text.len() >= 4 => &text[2..text.len() - 2],
            _ => "",
        }
    }

    fn is_empty(&self, id: CommentId) -> bool {
        self.body(id)
            .trim_matches(|c: char| c == '*' || c.is_whitespace())
            .is_empty()
    }

    fn is_tool_marker(&self, id: CommentId) -> bool {
        let body = self.body(id).trim_start_matches('*').trim();
        body.starts_with('$')
            || body.starts_with('@')
            || body.contains("$NON-NLS")
            || TOOL_MARKERS.iter().any(|marker| body.contains(marker))
    }

    /// Nothing but blanks before `offset` on its line.
    fn starts_line(&self, offset: usize) -> bool {
        let text = self.source.as_str();
        let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
        text[line_start..offset].trim().is_empty()
    }

    fn is_own_line_comment(&self, id: CommentId) -> bool {
        let comment = self.ast.comment(id);
        comment.kind == CommentKind::Line
            && !self.is_empty(id)
            && self.starts_line(comment.range.start_offset())
    }

    fn is_trailing_line_comment(&self, id: CommentId) -> bool {
        let comment = self.ast.comment(id);
        comment.kind == CommentKind::Line
            && !self.is_empty(id)
            && !self.is_tool_marker(id)
            && !self.starts_line(comment.range.start_offset())
    }

    /// Only blanks and at most one line break between `from` and `to`.
    fn adjacent(&self, from: usize, to: usize) -> bool {
        let gap = &self.source.as_str()[from..to];
        gap.trim().is_empty() && gap.matches('\n').count() <= 1
    }

    /// The declaration the comment at `comment` sits directly on.
    fn declaration_after(&self, comment: TextRange) -> Option<NodeId> {
        let decl = self
            .declarations
            .iter()
            .copied()
            .find(|decl| self.ast.range(*decl).start_offset() >= comment.end_offset())?;
        self.adjacent(comment.end_offset(), self.ast.range(decl).start_offset())
            .then_some(decl)
    }

    /// A field declaration ending earlier on the comment's line.
    fn field_before(&self, comment: TextRange) -> Option<NodeId> {
        self.declarations.iter().copied().find(|decl| {
            let end = self.ast.range(*decl).end_offset();
            matches!(self.ast.kind(*decl), NodeKind::FieldDecl { .. })
                && end <= comment.start_offset()
                && self.source.as_str()[end..comment.start_offset()]
                    .chars()
                    .all(|c| c == ' ' || c == '\t')
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run_rule;
    use pretty_assertions::assert_eq;

    fn clean(source: &str) -> String {
        run_rule(CommentsRule, source).text
    }

    #[test]
    fn line_comment_before_a_method_becomes_javadoc() {
        assert_eq!(
            clean("class A {\n    // returns x\n    int getX() {\n        return 0;\n    }\n}\n"),
            "class A {\n    /** returns x */\n    int getX() {\n        return 0;\n    }\n}\n"
        );
    }

    #[test]
    fn block_comments_and_line_series() {
        assert_eq!(
            clean("class A {\n    /* the x */\n    int x;\n\n    // first\n    // second\n    void m() {\n    }\n}\n"),
            "class A {\n    /** the x */\n    int x;\n\n    /**\n     * first\n     * second\n     */\n    void m() {\n    }\n}\n"
        );
    }

    #[test]
    fn trailing_field_comment_moves_above_the_field() {
        assert_eq!(
            clean("class A {\n    int x; // the x\n    /** y */\n    int y; // more y\n}\n"),
            "class A {\n    /** the x */\n    int x;\n    /** y */\n    int y; // more y\n}\n"
        );
    }

    #[test]
    fn empty_comments_are_removed() {
        assert_eq!(
            clean("class A {\n    //\n    /* */\n    void m() {\n        f(); /**/\n    }\n}\n"),
            "class A {\n    void m() {\n        f();\n    }\n}\n"
        );
    }

    #[test]
    fn comments_that_do_not_document_a_declaration_stay() {
        let source = "class A {\n    // TODO rename\n    int x;\n    String s = \"a\"; //$NON-NLS-1$\n    void m() {\n        // inside\n        f();\n    }\n    // detached\n\n\n    int y;\n}\n";
        assert_eq!(clean(source), source);
    }

    #[test]
    fn output_is_stable() {
        let once = clean("class A {\n    // a\n    int x; // b\n}\n");
        assert_eq!(once, "class A {\n    /**\n     * a\n     * b\n     */\n    int x;\n}\n");
        assert_eq!(clean(&once), once);
    }
}
