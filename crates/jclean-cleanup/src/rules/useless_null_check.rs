use jclean_ast::{AssignOp, InfixOp, NodeId, NodeKind, TextRangeExt};

use super::replace_with;
use crate::factory;
use crate::matcher::SameVariablesAndMethods;
use crate::refactorings::line_indent;
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};
use crate::side_effects::is_passive;

/// Drops a null check whose both outcomes produce the checked value.
///
/// `if (x == null) y = null; else y = x;` is `y = x;`, and
/// `if (x == null) return null; return x;` is `return x;`.
pub struct UselessNullCheck;

impl CleanupRule for UselessNullCheck {
    fn id(&self) -> &'static str {
        "useless_null_check"
    }

    fn name(&self) -> &'static str {
        "Remove useless null check"
    }

    fn description(&self) -> &'static str {
        "Removes null checks that assign or return null when the value is null anyway"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let ast = ctx.ast;
        let NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } = ast.kind(node)
        else {
            return Ok(Visit::Continue);
        };
        let Some((checked, is_null)) = null_check(ctx, *condition) else {
            return Ok(Visit::Continue);
        };

        let rewritten = match else_branch {
            Some(else_branch) => {
                let (null_branch, value_branch) = if is_null {
                    (*then_branch, *else_branch)
                } else {
                    (*else_branch, *then_branch)
                };
                collapse_branches(ctx, node, checked, null_branch, value_branch)
            }
            None => collapse_with_next_return(ctx, node, checked, is_null, *then_branch),
        };
        Ok(if rewritten {
            Visit::SkipSubtree
        } else {
            Visit::Continue
        })
    }
}

/// `x == null` or `x != null` (either side) on a passive `x`.
fn null_check(ctx: &RuleContext<'_>, condition: NodeId) -> Option<(NodeId, bool)> {
    let ast = ctx.ast;
    let NodeKind::Infix { op, operands } = ast.kind(ast.unparenthesize(condition)) else {
        return None;
    };
    let is_null = match op {
        InfixOp::Equals => true,
        InfixOp::NotEquals => false,
        _ => return None,
    };
    let checked = match operands.as_slice() {
        [lhs, rhs] if ast.is_null_literal(*rhs) => *lhs,
        [lhs, rhs] if ast.is_null_literal(*lhs) => *rhs,
        _ => return None,
    };
    (is_passive(ast, checked) && !ast.is_null_literal(checked)).then_some((checked, is_null))
}

fn single_statement(ctx: &RuleContext<'_>, branch: NodeId) -> Option<NodeId> {
    match ctx.ast.statements_of(Some(branch)).as_slice() {
        [stmt] => Some(*stmt),
        _ => None,
    }
}

fn same(ctx: &RuleContext<'_>, a: NodeId, b: NodeId) -> bool {
    ctx.matcher().matches(&mut SameVariablesAndMethods, a, b)
}

fn plain_assignment(ctx: &RuleContext<'_>, stmt: NodeId) -> Option<(NodeId, NodeId)> {
    let NodeKind::ExprStmt { expr } = ctx.ast.kind(stmt) else {
        return None;
    };
    match ctx.ast.kind(*expr) {
        NodeKind::Assign {
            op: AssignOp::Assign,
            lhs,
            rhs,
        } => Some((*lhs, *rhs)),
        _ => None,
    }
}

fn returned(ctx: &RuleContext<'_>, stmt: NodeId) -> Option<NodeId> {
    match ctx.ast.kind(stmt) {
        NodeKind::Return { expr: Some(expr) } => Some(*expr),
        _ => None,
    }
}

fn collapse_branches(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    checked: NodeId,
    null_branch: NodeId,
    value_branch: NodeId,
) -> bool {
    let (Some(null_stmt), Some(value_stmt)) = (
        single_statement(ctx, null_branch),
        single_statement(ctx, value_branch),
    ) else {
        return false;
    };

    let keeps_value = match (
        plain_assignment(ctx, null_stmt),
        plain_assignment(ctx, value_stmt),
    ) {
        (Some((null_target, null_value)), Some((target, value))) => {
            ctx.ast.is_null_literal(null_value)
                && same(ctx, null_target, target)
                && same(ctx, checked, value)
        }
        _ => match (returned(ctx, null_stmt), returned(ctx, value_stmt)) {
            (Some(null_value), Some(value)) => {
                ctx.ast.is_null_literal(null_value) && same(ctx, checked, value)
            }
            _ => false,
        },
    };
    if !keeps_value {
        return false;
    }

    let indent = line_indent(ctx.source, ctx.ast.range(node).start_offset());
    let text = factory::statement_text(ctx.ast, ctx.source, value_stmt, indent);
    replace_with(ctx, node, vec![text]);
    true
}

/// `if (x == null) return null; return x;` and its `!=` mirror.
fn collapse_with_next_return(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    checked: NodeId,
    is_null: bool,
    then_branch: NodeId,
) -> bool {
    let Some(next) = ctx.ast.next_sibling(node) else {
        return false;
    };
    let (Some(inside), Some(after)) = (
        single_statement(ctx, then_branch).and_then(|stmt| returned(ctx, stmt)),
        returned(ctx, next),
    ) else {
        return false;
    };
    let (null_value, value) = if is_null {
        (inside, after)
    } else {
        (after, inside)
    };
    if !ctx.ast.is_null_literal(null_value) || !same(ctx, checked, value) {
        return false;
    }

    if is_null {
        ctx.remove(node);
    } else {
        ctx.remove(next);
        let indent = line_indent(ctx.source, ctx.ast.range(node).start_offset());
        let stmt = single_statement(ctx, then_branch).unwrap_or(then_branch);
        let text = factory::statement_text(ctx.ast, ctx.source, stmt, indent);
        ctx.replace(node, text);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{clean_method, run_rule};
    use pretty_assertions::assert_eq;

    const FIELDS: &str = "    String x, y, z;\n";

    #[test]
    fn assignment_through_null_check() {
        assert_eq!(
            clean_method(
                UselessNullCheck,
                FIELDS,
                "        if (x == null) {\n            y = null;\n        } else {\n            y = x;\n        }\n"
            ),
            "        y = x;\n"
        );
        assert_eq!(
            clean_method(
                UselessNullCheck,
                FIELDS,
                "        if (null != x) y = x; else y = null;\n"
            ),
            "        y = x;\n"
        );
    }

    #[test]
    fn different_values_are_kept() {
        let body = "        if (x == null) {\n            y = null;\n        } else {\n            y = z;\n        }\n";
        assert_eq!(clean_method(UselessNullCheck, FIELDS, body), body);
        let body = "        if (x == null) {\n            y = null;\n        } else {\n            z = x;\n        }\n";
        assert_eq!(clean_method(UselessNullCheck, FIELDS, body), body);
    }

    #[test]
    fn return_forms() {
        let source = "class A {\n    String f(String x) {\n        if (x == null) {\n            return null;\n        }\n        return x;\n    }\n    String g(String x) {\n        if (x != null) {\n            return x;\n        }\n        return null;\n    }\n    String h(String x) {\n        if (x == null) return null; else return x;\n    }\n}\n";
        let outcome = run_rule(UselessNullCheck, source);
        assert_eq!(
            outcome.text,
            "class A {\n    String f(String x) {\n        return x;\n    }\n    String g(String x) {\n        return x;\n    }\n    String h(String x) {\n        return x;\n    }\n}\n"
        );
        assert_eq!(outcome.applied.get("useless_null_check"), Some(&3));
    }
}
