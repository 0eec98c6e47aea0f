use jclean_ast::{NodeId, NodeKind, TextRangeExt};

use super::replace_with;
use crate::common_suffix::{self, SuffixPlan};
use crate::factory;
use crate::refactorings::{line_indent, render, Refactorings, Replacement};
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};

/// Hoists the statements every branch of an `if`/`else` chain ends with.
///
/// ```text
/// if (a) { p(); q(); } else if (b) { r(); q(); } else { s(); q(); }
/// ```
/// becomes `if (a) { p(); } else if (b) { r(); } else { s(); }` followed by
/// a single `q();`.
pub struct CommonCodeInIfElse;

impl CleanupRule for CommonCodeInIfElse {
    fn id(&self) -> &'static str {
        "common_code_in_if_else"
    }

    fn name(&self) -> &'static str {
        "Extract common code in if/else"
    }

    fn description(&self) -> &'static str {
        "Moves statements shared by the end of every branch after the conditional"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let ast = ctx.ast;
        if !matches!(ast.kind(node), NodeKind::If { .. }) {
            return Ok(Visit::Continue);
        }
        // Chains are handled from their head.
        let continues_chain = ast.is_else_branch(node)
            && ast
                .parent(node)
                .is_some_and(|parent| matches!(ast.kind(parent), NodeKind::If { .. }));
        if continues_chain {
            return Ok(Visit::Continue);
        }
        let Some(chain) = common_suffix::collect_cases(ast, node) else {
            return Ok(Visit::Continue);
        };
        let matcher = ctx.matcher();
        let Some(plan) = common_suffix::plan(ast, &matcher, chain) else {
            return Ok(Visit::Continue);
        };

        let indent = line_indent(ctx.source, ast.range(node).start_offset());
        let common: Vec<String> = plan
            .common
            .iter()
            .map(|stmt| factory::statement_text(ast, ctx.source, *stmt, indent))
            .collect();
        tracing::trace!(
            target: "jclean.rules",
            offset = ast.range(node).start_offset(),
            cases = plan.chain.cases.len(),
            common = common.len(),
            "common suffix found"
        );

        if plan.all_removable() {
            replace_with(ctx, node, common);
            return Ok(Visit::SkipSubtree);
        }

        let mut statements = vec![remaining_chain(ctx, &plan)?];
        statements.extend(common);
        replace_with(ctx, node, statements);
        Ok(Visit::SkipSubtree)
    }
}

/// The chain's text once the shared statements are gone from every branch.
fn remaining_chain(ctx: &RuleContext<'_>, plan: &SuffixPlan) -> Result<String, RuleError> {
    let ast = ctx.ast;
    let chain = &plan.chain;
    let head = chain.head();
    let emptied = |i: usize| plan.shared[i].len() == chain.cases[i].len();
    let missing = || ctx.malformed(head, "if chain lost a branch");

    if chain.cases.len() == 2 && emptied(0) {
        let condition = chain.condition(ast, 0).ok_or_else(missing)?;
        let else_branch = chain.branch(ast, 1).ok_or_else(missing)?;
        let body = render_without(ctx, else_branch, &plan.shared[1])?;
        let negated = factory::negate(ast, ctx.source, condition);
        return Ok(format!("if ({}) {body}", negated.text));
    }

    let last = chain.cases.len() - 1;
    let mut refactorings = Refactorings::new();
    for (i, shared) in plan.shared.iter().enumerate() {
        let branch = chain.branch(ast, i).ok_or_else(missing)?;
        if !emptied(i) {
            for stmt in shared {
                refactorings.remove(*stmt, ast.range(*stmt));
            }
        } else if i == last {
            refactorings.remove(branch, ast.range(branch));
        } else {
            refactorings.replace(branch, ast.range(branch), Replacement::Text("{}".into()));
        }
    }
    let edits = refactorings
        .synthesize(ast, ctx.source)
        .map_err(|err| ctx.malformed(head, err.to_string()))?;
    render(ast, ctx.source, head, &edits).map_err(|err| ctx.malformed(head, err.to_string()))
}

fn render_without(
    ctx: &RuleContext<'_>,
    branch: NodeId,
    removed: &[NodeId],
) -> Result<String, RuleError> {
    let mut refactorings = Refactorings::new();
    for stmt in removed {
        refactorings.remove(*stmt, ctx.ast.range(*stmt));
    }
    let edits = refactorings
        .synthesize(ctx.ast, ctx.source)
        .map_err(|err| ctx.malformed(branch, err.to_string()))?;
    render(ctx.ast, ctx.source, branch, &edits).map_err(|err| ctx.malformed(branch, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::clean_method;
    use pretty_assertions::assert_eq;

    const FIELDS: &str = "    boolean a, b;\n";

    fn clean(body: &str) -> String {
        clean_method(CommonCodeInIfElse, FIELDS, body)
    }

    #[test]
    fn shared_tail_moves_after_the_chain() {
        assert_eq!(
            clean("        if (a) {\n            p();\n            q();\n        } else if (b) {\n            r();\n            q();\n        } else {\n            s();\n            q();\n        }\n"),
            "        if (a) {\n            p();\n        } else if (b) {\n            r();\n        } else {\n            s();\n        }\n        q();\n"
        );
    }

    #[test]
    fn identical_branches_with_passive_condition_disappear() {
        assert_eq!(
            clean("        if (a) {\n            x();\n        } else {\n            x();\n        }\n"),
            "        x();\n"
        );
        assert_eq!(clean("        while (b) if (a) x(); else x();\n"), "        while (b) x();\n");
    }

    #[test]
    fn emptied_first_case_keeps_its_condition_as_a_guard() {
        assert_eq!(
            clean("        if (check()) {\n            x();\n        } else {\n            y();\n            x();\n        }\n"),
            "        if (!check()) {\n            y();\n        }\n        x();\n"
        );
    }

    #[test]
    fn emptied_final_else_is_dropped() {
        assert_eq!(
            clean("        if (a) {\n            p();\n            x();\n        } else {\n            x();\n        }\n"),
            "        if (a) {\n            p();\n        }\n        x();\n"
        );
    }

    #[test]
    fn chains_without_final_else_are_left_alone() {
        let body = "        if (a) {\n            x();\n        } else if (b) {\n            x();\n        }\n";
        assert_eq!(clean(body), body);
    }
}
