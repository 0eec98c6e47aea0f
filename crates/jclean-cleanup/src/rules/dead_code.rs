//! Removes branches that never run and blocks that do nothing.

use jclean_ast::{Ast, InfixOp, NodeId, NodeKind, TextRangeExt};

use super::{in_block, lifted_statements, replace_with};
use crate::factory;
use crate::matcher::SameVariablesAndMethods;
use crate::refactorings::line_indent;
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};
use crate::side_effects::{collect_side_effects, is_passive};

/// Floating point `x == x` is false for NaN.
const FLOATING: &[&str] = &["float", "double", "java.lang.Float", "java.lang.Double"];

pub struct DeadCode;

impl CleanupRule for DeadCode {
    fn id(&self) -> &'static str {
        "dead_code"
    }

    fn name(&self) -> &'static str {
        "Remove dead code"
    }

    fn description(&self) -> &'static str {
        "Removes empty branches, folds constant conditions and inlines empty try statements"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        match ctx.ast.kind(node) {
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => visit_if(ctx, node, *condition, *then_branch, *else_branch),
            NodeKind::Try {
                resources,
                body,
                finally,
                ..
            } if resources.is_empty() => visit_try(ctx, node, *body, *finally),
            _ => Ok(Visit::Continue),
        }
    }
}

fn visit_if(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    condition: NodeId,
    then_branch: NodeId,
    else_branch: Option<NodeId>,
) -> Result<Visit, RuleError> {
    let ast = ctx.ast;
    if let Some(value) = constant_condition(ctx, condition) {
        let taken = if value { Some(then_branch) } else { else_branch };
        match taken {
            Some(branch) => inline_branch(ctx, node, branch),
            None => ctx.remove(node),
        }
        return Ok(Visit::SkipSubtree);
    }

    let then_empty = ast.is_empty_branch(then_branch);
    match else_branch {
        Some(else_branch) if !then_empty && ast.is_empty_branch(else_branch) => {
            ctx.remove(else_branch);
            Ok(Visit::Continue)
        }
        Some(else_branch) if then_empty && !ast.is_empty_branch(else_branch) => {
            let negated = factory::negate(ast, ctx.source, condition);
            let body = branch_as_block(ctx, node, else_branch);
            ctx.replace(node, format!("if ({}) {body}", negated.text));
            Ok(Visit::SkipSubtree)
        }
        _ if then_empty => {
            let effects =
                collect_side_effects(ast, ctx.oracle, ctx.side_effect_policy(), condition)?;
            if let Some(effect) = effects
                .iter()
                .find(|effect| !always_evaluated(ast, condition, **effect))
            {
                return Err(ctx.malformed(
                    *effect,
                    "side effect is only evaluated under a short-circuit operator",
                ));
            }
            let statements = effects
                .iter()
                .map(|effect| format!("{};", ctx.text(*effect)))
                .collect();
            replace_with(ctx, node, statements);
            Ok(Visit::SkipSubtree)
        }
        _ => Ok(Visit::Continue),
    }
}

fn visit_try(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    body: NodeId,
    finally: Option<NodeId>,
) -> Result<Visit, RuleError> {
    if !ctx.ast.is_empty_branch(body) {
        return Ok(Visit::Continue);
    }
    match finally {
        Some(finally) if !ctx.ast.is_empty_branch(finally) => inline_branch(ctx, node, finally),
        _ => ctx.remove(node),
    }
    Ok(Visit::SkipSubtree)
}

/// `true`, `false`, a boolean constant, or a passive `x == x` / `x != x`.
fn constant_condition(ctx: &RuleContext<'_>, condition: NodeId) -> Option<bool> {
    let condition = ctx.ast.unparenthesize(condition);
    if let Some(value) = ctx.ast.boolean_literal_value(condition) {
        return Some(value);
    }
    if let Some(value) = ctx
        .oracle
        .constant_value(condition)
        .and_then(|value| value.as_bool())
    {
        return Some(value);
    }

    let NodeKind::Infix { op, operands } = ctx.ast.kind(condition) else {
        return None;
    };
    let value = match op {
        InfixOp::Equals => true,
        InfixOp::NotEquals => false,
        _ => return None,
    };
    let [lhs, rhs] = operands.as_slice() else {
        return None;
    };
    let ty = ctx.oracle.type_of(*lhs)?;
    if FLOATING.iter().any(|name| ty.is_named(name)) {
        return None;
    }
    let same = is_passive(ctx.ast, *lhs)
        && ctx
            .matcher()
            .matches(&mut SameVariablesAndMethods, *lhs, *rhs);
    same.then_some(value)
}

/// Replaces `stmt` with the statements of `branch`, which always runs.
fn inline_branch(ctx: &mut RuleContext<'_>, stmt: NodeId, branch: NodeId) {
    let ast = ctx.ast;
    if !in_block(ast, stmt) {
        if ast.is_empty_branch(branch) {
            ctx.remove(stmt);
        } else {
            let indent = line_indent(ctx.source, ast.range(stmt).start_offset());
            let text = factory::statement_text(ast, ctx.source, branch, indent);
            ctx.replace(stmt, text);
        }
        return;
    }

    let statements = ast.statements_of(Some(branch));
    if ast.ends_with_jump(branch) {
        for unreachable in ast.following_siblings(stmt) {
            ctx.remove(unreachable);
        }
    } else if declares_clashing_names(ast, &statements, stmt) {
        tracing::debug!(
            target: "jclean.rules",
            offset = ast.range(stmt).start_offset(),
            "inlined locals would clash with later declarations; keeping the block"
        );
        let indent = line_indent(ctx.source, ast.range(stmt).start_offset());
        let text = factory::statement_text(ast, ctx.source, branch, indent);
        ctx.replace(stmt, text);
        return;
    }
    let lifted = lifted_statements(ctx, stmt, branch);
    replace_with(ctx, stmt, lifted);
}

/// Whether locals declared by `statements` are declared again after `stmt`.
fn declares_clashing_names(ast: &Ast, statements: &[NodeId], stmt: NodeId) -> bool {
    let declared: Vec<&str> = statements
        .iter()
        .flat_map(|s| ast.declared_names(*s))
        .collect();
    if declared.is_empty() {
        return false;
    }
    ast.following_siblings(stmt)
        .into_iter()
        .flat_map(|sibling| ast.preorder(sibling))
        .flat_map(|node| ast.declared_names(node))
        .any(|name| declared.contains(&name))
}

/// `branch` as block text for the position of `stmt`.
fn branch_as_block(ctx: &RuleContext<'_>, stmt: NodeId, branch: NodeId) -> String {
    let indent = line_indent(ctx.source, ctx.ast.range(stmt).start_offset());
    if matches!(ctx.ast.kind(branch), NodeKind::Block { .. }) {
        return factory::statement_text(ctx.ast, ctx.source, branch, indent);
    }
    let inner = format!("{indent}{}", ctx.source.indent_unit());
    let text = factory::statement_text(ctx.ast, ctx.source, branch, &inner);
    factory::block(ctx.source, indent, &[text])
}

/// Whether evaluating `root` always evaluates `node`.
fn always_evaluated(ast: &Ast, root: NodeId, node: NodeId) -> bool {
    let mut child = node;
    for parent in ast.ancestors(node) {
        let conditional = match ast.kind(parent) {
            NodeKind::Infix {
                op: InfixOp::ConditionalAnd | InfixOp::ConditionalOr,
                operands,
            } => operands.first() != Some(&child),
            NodeKind::Conditional { condition, .. } => *condition != child,
            _ => false,
        };
        if conditional {
            return false;
        }
        if parent == root {
            break;
        }
        child = parent;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::clean_method;
    use pretty_assertions::assert_eq;

    fn clean(members: &str, body: &str) -> String {
        clean_method(DeadCode, members, body)
    }

    #[test]
    fn constant_false_branch_is_deleted() {
        assert_eq!(clean("", "        if (false) {\n            int i = 0;\n        }\n"), "");
        assert_eq!(clean("", "        if (false) {\n            foo();\n        }\n"), "");
    }

    #[test]
    fn empty_branch_keeps_side_effects_of_its_condition() {
        assert_eq!(clean("", "        if (foo()) {\n        }\n"), "        foo();\n");
        assert_eq!(
            clean("", "        if (foo() | bar()) {\n        }\n"),
            "        foo();\n        bar();\n"
        );
        let conditional = "        if (i++ > 0 || bar()) {\n        }\n";
        assert_eq!(clean("    int i;\n", conditional), conditional);
    }

    #[test]
    fn passive_condition_of_empty_branch_goes_away() {
        assert_eq!(clean("    boolean b;\n", "        if (b) {\n        } else {\n        }\n"), "");
    }

    #[test]
    fn constant_true_inlines_the_then_branch() {
        assert_eq!(
            clean(
                "",
                "        if (true) {\n            a();\n            b();\n        } else {\n            c();\n        }\n"
            ),
            "        a();\n        b();\n"
        );
    }

    #[test]
    fn self_comparison_is_constant() {
        assert_eq!(
            clean("    int x;\n", "        if (x == x) {\n            a();\n        }\n"),
            "        a();\n"
        );
        let unchanged = "        if (d == d) {\n            a();\n        }\n";
        assert_eq!(clean("    double d;\n", unchanged), unchanged);
    }

    #[test]
    fn empty_else_is_removed() {
        assert_eq!(
            clean(
                "    boolean b;\n",
                "        if (b) {\n            a();\n        } else {\n        }\n"
            ),
            "        if (b) {\n            a();\n        }\n"
        );
    }

    #[test]
    fn empty_then_becomes_a_negated_guard() {
        assert_eq!(
            clean(
                "    int x;\n",
                "        if (x == 0) {\n        } else {\n            a();\n        }\n"
            ),
            "        if (x != 0) {\n            a();\n        }\n"
        );
    }

    #[test]
    fn jump_in_inlined_branch_drops_unreachable_siblings() {
        assert_eq!(
            clean("", "        if (true) {\n            return;\n        }\n        a();\n"),
            "        return;\n"
        );
    }

    #[test]
    fn clashing_locals_keep_their_block() {
        assert_eq!(
            clean(
                "",
                "        if (true) {\n            int i = 0;\n            a(i);\n        }\n        int i = 1;\n"
            ),
            "        {\n            int i = 0;\n            a(i);\n        }\n        int i = 1;\n"
        );
    }

    #[test]
    fn short_circuited_effects_are_left_alone() {
        let body = "        if (b && foo()) {\n        }\n";
        assert_eq!(clean("    boolean b;\n", body), body);
    }

    #[test]
    fn empty_try_inlines_its_finally_block() {
        assert_eq!(
            clean("", "        try {\n        } finally {\n            a();\n        }\n"),
            "        a();\n"
        );
        assert_eq!(clean("", "        try {\n        } finally {\n        }\n"), "");
    }
}
