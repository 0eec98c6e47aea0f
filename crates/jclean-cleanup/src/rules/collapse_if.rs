use jclean_ast::{NodeId, NodeKind, TextRangeExt};

use crate::factory;
use crate::refactorings::line_indent;
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};

/// `if (a) { if (b) S }` becomes `if (a && b) S`.
pub struct CollapseIf;

impl CleanupRule for CollapseIf {
    fn id(&self) -> &'static str {
        "collapse_if"
    }

    fn name(&self) -> &'static str {
        "Collapse nested if"
    }

    fn description(&self) -> &'static str {
        "Merges an if statement whose only content is another if without else"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let ast = ctx.ast;
        let NodeKind::If {
            condition: outer_condition,
            then_branch: outer_then,
            else_branch: None,
        } = ast.kind(node)
        else {
            return Ok(Visit::Continue);
        };
        let statements = ast.statements_of(Some(*outer_then));
        let &[inner] = statements.as_slice() else {
            return Ok(Visit::Continue);
        };
        let NodeKind::If {
            condition: inner_condition,
            then_branch: inner_then,
            else_branch: None,
        } = ast.kind(inner)
        else {
            return Ok(Visit::Continue);
        };

        let outer_then_range = ast.range(*outer_then);
        let inner_range = ast.range(inner);
        let stray_comment = ast.comments().iter().any(|comment| {
            outer_then_range.contains_range(comment.range)
                && !inner_range.contains_range(comment.range)
        });
        if stray_comment {
            return Err(ctx.malformed(node, "comments between the nested if statements"));
        }

        let condition = factory::and(ctx.expr(*outer_condition), ctx.expr(*inner_condition));
        let indent = line_indent(ctx.source, ast.range(node).start_offset());
        let body = factory::statement_text(ast, ctx.source, *inner_then, indent);
        ctx.replace(node, format!("if ({}) {body}", condition.text));
        Ok(Visit::SkipSubtree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::clean_method;
    use pretty_assertions::assert_eq;

    const FIELDS: &str = "    boolean a, b, c;\n";

    #[test]
    fn nested_ifs_are_merged_and_reindented() {
        assert_eq!(
            clean_method(
                CollapseIf,
                FIELDS,
                "        if (a) {\n            if (b) {\n                x();\n            }\n        }\n"
            ),
            "        if (a && b) {\n            x();\n        }\n"
        );
    }

    #[test]
    fn looser_operands_are_parenthesized() {
        assert_eq!(
            clean_method(
                CollapseIf,
                FIELDS,
                "        if (a || b) {\n            if (c) {\n                x();\n            }\n        }\n"
            ),
            "        if ((a || b) && c) {\n            x();\n        }\n"
        );
    }

    #[test]
    fn three_levels_collapse_over_two_passes() {
        assert_eq!(
            clean_method(
                CollapseIf,
                FIELDS,
                "        if (a) {\n            if (b) {\n                if (c) {\n                    x();\n                }\n            }\n        }\n"
            ),
            "        if (a && b && c) {\n            x();\n        }\n"
        );
    }

    #[test]
    fn else_branches_and_comments_block_the_merge() {
        let with_else = "        if (a) {\n            if (b) {\n                x();\n            } else {\n                y();\n            }\n        }\n";
        assert_eq!(clean_method(CollapseIf, FIELDS, with_else), with_else);
        let with_comment = "        if (a) {\n            // only when b\n            if (b) {\n                x();\n            }\n        }\n";
        assert_eq!(clean_method(CollapseIf, FIELDS, with_comment), with_comment);
    }
}
