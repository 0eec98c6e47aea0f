//! Boolean simplifications.
//!
//! - `if (c) { x = true; } else { x = false; }` becomes `x = c;`. Branches may
//!   differ at any number of sites, as long as every difference is a pair of
//!   opposite boolean constants.
//! - `c ? true : false` becomes `c`.
//! - `if (c) return true; return false;` becomes `return c;`, and a literal on
//!   one side only turns into `&&` or `||`.
//! - `boolean x = false; if (c) x = true;` becomes `boolean x = c;`.
//! - `Boolean.valueOf(true)` becomes `Boolean.TRUE`.

use std::collections::HashSet;

use jclean_ast::{AssignOp, LiteralKind, NodeId, NodeKind};
use jclean_core::{TextEdit, TextRangeExt};

use super::replace_with;
use crate::factory::{self, ExprText};
use crate::matcher::{BooleanPolicy, SameVariablesAndMethods};
use crate::refactorings::{line_indent, render};
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};
use crate::side_effects::{has_side_effects, is_passive};

pub struct BooleanRule;

impl CleanupRule for BooleanRule {
    fn id(&self) -> &'static str {
        "boolean"
    }

    fn name(&self) -> &'static str {
        "Simplify boolean code"
    }

    fn description(&self) -> &'static str {
        "Replaces branches and conditionals that only choose between boolean constants"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let rewritten = match ctx.ast.kind(node) {
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let (condition, then_branch, else_branch) = (*condition, *then_branch, *else_branch);
                let collapsed = match else_branch {
                    Some(else_branch) => {
                        collapse_if_else(ctx, node, condition, then_branch, else_branch)?
                    }
                    None => false,
                };
                collapsed || collapse_returns(ctx, node, condition, then_branch, else_branch)
            }
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => collapse_conditional(ctx, node, *condition, *then_expr, *else_expr),
            NodeKind::LocalVarDecl { .. } | NodeKind::ExprStmt { .. } => {
                assign_from_condition(ctx, node)
            }
            NodeKind::MethodCall { .. } => value_of_constant(ctx, node)?,
            _ => false,
        };
        Ok(if rewritten {
            Visit::SkipSubtree
        } else {
            Visit::Continue
        })
    }
}

/// The value of a primitive `true`/`false` literal.
fn literal_bool(ctx: &RuleContext<'_>, expr: NodeId) -> Option<bool> {
    match ctx.ast.kind(ctx.ast.unparenthesize(expr)) {
        NodeKind::Literal {
            kind: LiteralKind::Boolean(value),
            ..
        } => Some(*value),
        _ => None,
    }
}

fn condition_as(ctx: &RuleContext<'_>, condition: NodeId, value: bool) -> ExprText {
    if value {
        ctx.expr(condition)
    } else {
        factory::negate(ctx.ast, ctx.source, condition)
    }
}

/// `Boolean.valueOf(boolean)` first shipped with Java 1.4.
const VALUE_OF_RELEASE: u16 = 4;

/// `Boolean.valueOf(expr)`, when the sources may call it.
fn value_of(ctx: &RuleContext<'_>, expr: ExprText) -> Option<ExprText> {
    ctx.targets_release(VALUE_OF_RELEASE).then(|| {
        ExprText::primary(format!(
            "{}.valueOf({})",
            factory::boolean_type_name(ctx.ast),
            expr.text
        ))
    })
}

fn collapse_if_else(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    condition: NodeId,
    then_branch: NodeId,
    else_branch: NodeId,
) -> Result<bool, RuleError> {
    let ast = ctx.ast;
    let matcher = ctx.matcher();
    let mut first = BooleanPolicy::new();
    if !matcher.matches(&mut first, then_branch, else_branch) {
        return Ok(false);
    }
    let state = first.into_state();
    if state.is_empty() {
        return Ok(false);
    }
    let mut second = BooleanPolicy::reusing(&state);
    if !matcher.matches(&mut second, then_branch, else_branch) || second.into_state() != state {
        return Err(ctx.malformed(node, "boolean sites pair differently on the second pass"));
    }
    if state.len() > 1 && has_side_effects(ast, ctx.oracle, ctx.side_effect_policy(), condition)? {
        return Err(ctx.malformed(
            condition,
            "condition with side effects would be evaluated more than once",
        ));
    }

    let statements = ast.statements_of(Some(then_branch));
    let last_site_statement = state
        .references()
        .filter_map(|site| {
            statements
                .iter()
                .position(|stmt| ast.is_ancestor_or_self(*stmt, site))
        })
        .max()
        .unwrap_or(0);
    if last_site_statement > 0 {
        if !is_passive(ast, condition) {
            return Err(ctx.malformed(
                condition,
                "condition would be evaluated after the statements before its use",
            ));
        }
        if let Some(write) = first_write_to_condition(ctx, condition, &statements[..last_site_statement])? {
            return Err(ctx.malformed(write, "statement before a boolean site changes what the condition reads"));
        }
    }

    let mut edits = Vec::with_capacity(state.len());
    for site in state.references() {
        let value = ast
            .boolean_literal_value(site)
            .or_else(|| ctx.oracle.constant_value(site)?.as_bool())
            .ok_or_else(|| ctx.malformed(site, "boolean site without a constant value"))?;
        let expr = condition_as(ctx, condition, value);
        let boxed = ast.is_boolean_constant_field(site)
            || ctx
                .oracle
                .type_of(site)
                .is_some_and(|ty| ty.is_boolean_object());
        let text = if boxed {
            value_of(ctx, expr)
                .ok_or_else(|| ctx.malformed(site, "Boolean.valueOf is newer than the target release"))?
                .text
        } else {
            expr.at_least(factory::slot_precedence(ast, site))
        };
        edits.push(TextEdit::replace(ast.range(site), text));
    }

    let indent = line_indent(ctx.source, ast.range(node).start_offset());
    let mut rendered = Vec::with_capacity(statements.len());
    for stmt in statements {
        let range = ast.range(stmt);
        let local: Vec<TextEdit> = edits
            .iter()
            .filter(|edit| range.contains_range(edit.range))
            .cloned()
            .collect();
        let text = render(ast, ctx.source, stmt, &local)
            .map_err(|err| ctx.malformed(stmt, err.to_string()))?;
        let from = line_indent(ctx.source, range.start_offset());
        rendered.push(factory::reindent(&text, from, indent));
    }
    replace_with(ctx, node, rendered);
    Ok(true)
}

/// First node in `statements` that may change a value `condition` reads.
///
/// Assignments and updates count when their target mentions a variable the
/// condition reads. Calls with side effects count unless the condition only
/// reads locals.
fn first_write_to_condition(
    ctx: &RuleContext<'_>,
    condition: NodeId,
    statements: &[NodeId],
) -> Result<Option<NodeId>, RuleError> {
    let ast = ctx.ast;
    let mut read = HashSet::new();
    let mut locals_only = true;
    for node in ast.preorder(condition) {
        match ast.kind(node) {
            NodeKind::SimpleName { .. } => match ctx.oracle.variable_of(node) {
                Some(binding) => {
                    locals_only &= !binding.is_field;
                    read.insert(binding.id);
                }
                None => locals_only = false,
            },
            NodeKind::ArrayAccess { .. } | NodeKind::This { .. } => locals_only = false,
            _ => {}
        }
    }

    let mentions_read = |target: NodeId| {
        ast.preorder(target).into_iter().any(|n| {
            ctx.oracle
                .variable_of(n)
                .is_some_and(|binding| read.contains(&binding.id))
        })
    };
    for stmt in statements {
        for node in ast.preorder(*stmt) {
            let written = match ast.kind(node) {
                NodeKind::Assign { lhs, .. } => mentions_read(*lhs),
                NodeKind::Prefix { op, operand } if op.is_update() => mentions_read(*operand),
                NodeKind::Postfix { operand, .. } => mentions_read(*operand),
                NodeKind::MethodCall { .. } | NodeKind::SuperMethodCall { .. } | NodeKind::New { .. } => {
                    !locals_only && has_side_effects(ast, ctx.oracle, ctx.side_effect_policy(), node)?
                }
                _ => false,
            };
            if written {
                return Ok(Some(node));
            }
        }
    }
    Ok(None)
}

fn returned_expr(ctx: &RuleContext<'_>, branch: NodeId) -> Option<NodeId> {
    match ctx.ast.statements_of(Some(branch)).as_slice() {
        [stmt] => match ctx.ast.kind(*stmt) {
            NodeKind::Return { expr: Some(expr) } => Some(*expr),
            _ => None,
        },
        _ => None,
    }
}

fn returns_primitive_boolean(ctx: &RuleContext<'_>, node: NodeId) -> bool {
    let Some(method) = ctx.ast.enclosing_method(node) else {
        return false;
    };
    match ctx.ast.kind(method) {
        NodeKind::MethodDecl {
            return_type: Some(ty),
            ..
        } => matches!(ctx.ast.kind(*ty), NodeKind::TypeRef { text } if text == "boolean"),
        _ => false,
    }
}

/// `if (c) return a; [else] return b;` where `a` or `b` is a literal.
fn collapse_returns(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    condition: NodeId,
    then_branch: NodeId,
    else_branch: Option<NodeId>,
) -> bool {
    let Some(then_expr) = returned_expr(ctx, then_branch) else {
        return false;
    };
    let (else_expr, trailing) = match else_branch {
        Some(else_branch) => match returned_expr(ctx, else_branch) {
            Some(expr) => (expr, None),
            None => return false,
        },
        None => {
            let Some(next) = ctx.ast.next_sibling(node) else {
                return false;
            };
            match ctx.ast.kind(next) {
                NodeKind::Return { expr: Some(expr) } => (*expr, Some(next)),
                _ => return false,
            }
        }
    };
    if !returns_primitive_boolean(ctx, node) {
        return false;
    }

    let result = match (literal_bool(ctx, then_expr), literal_bool(ctx, else_expr)) {
        (Some(then_value), Some(else_value)) if then_value != else_value => {
            condition_as(ctx, condition, then_value)
        }
        (Some(true), None) => factory::or(ctx.expr(condition), ctx.expr(else_expr)),
        (Some(false), None) => factory::and(
            factory::negate(ctx.ast, ctx.source, condition),
            ctx.expr(else_expr),
        ),
        (None, Some(true)) => factory::or(
            factory::negate(ctx.ast, ctx.source, condition),
            ctx.expr(then_expr),
        ),
        (None, Some(false)) => factory::and(ctx.expr(condition), ctx.expr(then_expr)),
        _ => return false,
    };
    ctx.replace(node, format!("return {};", result.text));
    if let Some(next) = trailing {
        ctx.remove(next);
    }
    true
}

/// `c ? true : false`, `c ? Boolean.FALSE : Boolean.TRUE` and the like.
fn collapse_conditional(
    ctx: &mut RuleContext<'_>,
    node: NodeId,
    condition: NodeId,
    then_expr: NodeId,
    else_expr: NodeId,
) -> bool {
    let ast = ctx.ast;
    let expr = match (literal_bool(ctx, then_expr), literal_bool(ctx, else_expr)) {
        (Some(then_value), Some(else_value)) if then_value != else_value => {
            condition_as(ctx, condition, then_value)
        }
        (None, None)
            if ast.is_boolean_constant_field(then_expr)
                && ast.is_boolean_constant_field(else_expr) =>
        {
            match (
                ast.boolean_literal_value(then_expr),
                ast.boolean_literal_value(else_expr),
            ) {
                (Some(then_value), Some(else_value)) if then_value != else_value => {
                    match value_of(ctx, condition_as(ctx, condition, then_value)) {
                        Some(expr) => expr,
                        None => return false,
                    }
                }
                _ => return false,
            }
        }
        _ => return false,
    };
    let text = expr.at_least(factory::slot_precedence(ast, node));
    ctx.replace(node, text);
    true
}

/// `boolean x = false; if (c) x = true;` and `x = false; if (c) x = true;`.
fn assign_from_condition(ctx: &mut RuleContext<'_>, node: NodeId) -> bool {
    let ast = ctx.ast;
    let Some((target, initial)) = initial_assignment(ctx, node) else {
        return false;
    };
    let Some(next) = ast.next_sibling(node) else {
        return false;
    };
    let NodeKind::If {
        condition,
        then_branch,
        else_branch: None,
    } = ast.kind(next)
    else {
        return false;
    };
    let statements = ast.statements_of(Some(*then_branch));
    let [assignment] = statements.as_slice() else {
        return false;
    };
    let Some((lhs, rhs)) = plain_assignment(ctx, *assignment) else {
        return false;
    };
    let (Some(initial_value), Some(assigned_value)) =
        (literal_bool(ctx, initial), literal_bool(ctx, rhs))
    else {
        return false;
    };
    if initial_value == assigned_value {
        return false;
    }

    let matcher = ctx.matcher();
    if !matcher.matches(&mut SameVariablesAndMethods, target, lhs) {
        return false;
    }
    let reads_target = ast
        .preorder(*condition)
        .into_iter()
        .any(|n| matcher.matches(&mut SameVariablesAndMethods, target, n));
    if reads_target {
        return false;
    }

    let value = condition_as(ctx, *condition, assigned_value);
    ctx.replace(initial, value.at_least(factory::ASSIGNMENT));
    ctx.remove(next);
    true
}

/// The assigned name and the initial value of a declaration or assignment of a
/// primitive boolean.
fn initial_assignment(ctx: &RuleContext<'_>, node: NodeId) -> Option<(NodeId, NodeId)> {
    let ast = ctx.ast;
    let (target, value) = match ast.kind(node) {
        NodeKind::LocalVarDecl { fragments, .. } => {
            let [fragment] = fragments.as_slice() else {
                return None;
            };
            match ast.kind(*fragment) {
                NodeKind::VarFragment {
                    name,
                    initializer: Some(initializer),
                } => (*name, *initializer),
                _ => return None,
            }
        }
        NodeKind::ExprStmt { .. } => plain_assignment(ctx, node)?,
        _ => return None,
    };
    let binding = ctx.oracle.variable_of(target)?;
    binding.ty.is_boolean().then_some((target, value))
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

/// `Boolean.valueOf(true)` is `Boolean.TRUE`.
fn value_of_constant(ctx: &mut RuleContext<'_>, node: NodeId) -> Result<bool, RuleError> {
    let ast = ctx.ast;
    let NodeKind::MethodCall {
        receiver: Some(receiver),
        name,
        args,
    } = ast.kind(node)
    else {
        return Ok(false);
    };
    let [arg] = args.as_slice() else {
        return Ok(false);
    };
    if ast.identifier(*name) != Some("valueOf") {
        return Ok(false);
    }
    let Some(value) = literal_bool(ctx, *arg) else {
        return Ok(false);
    };
    let method = ctx
        .oracle
        .method_of(node)
        .ok_or_else(|| ctx.unresolved(node, "valueOf call"))?;
    if method.declaring_type != "java.lang.Boolean" {
        return Ok(false);
    }
    let constant = if value { "TRUE" } else { "FALSE" };
    let text = format!("{}.{constant}", ctx.text(*receiver));
    ctx.replace(node, text);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{clean_method, clean_method_with, run_rule};
    use jclean_config::CleanupConfig;
    use pretty_assertions::assert_eq;

    const FIELDS: &str = "    boolean b, x, y;\n    Boolean boxed;\n    int n;\n";

    fn clean(body: &str) -> String {
        clean_method(BooleanRule, FIELDS, body)
    }

    #[test]
    fn if_else_on_opposite_constants_collapses() {
        assert_eq!(
            clean("        if (b) {\n            x = true;\n        } else {\n            x = false;\n        }\n"),
            "        x = b;\n"
        );
        assert_eq!(
            clean("        if (b) {\n            x = false;\n        } else {\n            x = true;\n        }\n"),
            "        x = !b;\n"
        );
    }

    #[test]
    fn several_sites_and_operator_precedence() {
        assert_eq!(
            clean("        if (n > 0 || b) {\n            x = true;\n            y = false;\n        } else {\n            x = false;\n            y = true;\n        }\n"),
            "        x = n > 0 || b;\n        y = !(n > 0 || b);\n"
        );
        assert_eq!(
            clean("        if (b) {\n            f(n, true);\n        } else {\n            f(n, false);\n        }\n"),
            "        f(n, b);\n"
        );
    }

    #[test]
    fn boxed_sites_use_value_of() {
        assert_eq!(
            clean("        if (b) {\n            boxed = Boolean.FALSE;\n        } else {\n            boxed = Boolean.TRUE;\n        }\n"),
            "        boxed = Boolean.valueOf(!b);\n"
        );
    }

    #[test]
    fn boxed_sites_need_a_release_with_value_of() {
        let config = CleanupConfig {
            java_release: 3,
            ..CleanupConfig::default()
        };
        let body = "        if (b) {\n            boxed = Boolean.FALSE;\n        } else {\n            boxed = Boolean.TRUE;\n        }\n        boxed = b ? Boolean.TRUE : Boolean.FALSE;\n";
        assert_eq!(clean_method_with(config.clone(), BooleanRule, FIELDS, body), body);
        assert_eq!(
            clean_method_with(config, BooleanRule, FIELDS, "        x = b ? true : false;\n"),
            "        x = b;\n"
        );
    }

    #[test]
    fn side_effecting_condition_is_not_duplicated() {
        let body = "        if (check()) {\n            x = true;\n            y = false;\n        } else {\n            x = false;\n            y = true;\n        }\n";
        assert_eq!(clean(body), body);
    }

    #[test]
    fn condition_is_not_moved_past_statements_that_change_it() {
        let flips = "        if (b) {\n            b = !b;\n            x = true;\n        } else {\n            b = !b;\n            x = false;\n        }\n";
        assert_eq!(clean(flips), flips);
        let counts = "        if (n > 0) {\n            n--;\n            x = true;\n        } else {\n            n--;\n            x = false;\n        }\n";
        assert_eq!(clean(counts), counts);
        let calls = "        if (b) {\n            f();\n            x = true;\n        } else {\n            f();\n            x = false;\n        }\n";
        assert_eq!(clean(calls), calls);
        let impure = "        if (n++ > 0) {\n            y = b;\n            x = true;\n        } else {\n            y = b;\n            x = false;\n        }\n";
        assert_eq!(clean(impure), impure);
    }

    #[test]
    fn condition_on_locals_moves_past_calls() {
        assert_eq!(
            clean("        boolean c = n > 0;\n        if (c) {\n            f();\n            x = true;\n        } else {\n            f();\n            x = false;\n        }\n"),
            "        boolean c = n > 0;\n        f();\n        x = c;\n"
        );
    }

    #[test]
    fn boolean_ternaries() {
        assert_eq!(clean("        x = b ? true : false;\n"), "        x = b;\n");
        assert_eq!(clean("        x = n > 0 ? false : true;\n"), "        x = !(n > 0);\n");
        assert_eq!(
            clean("        boxed = b ? Boolean.TRUE : Boolean.FALSE;\n"),
            "        boxed = Boolean.valueOf(b);\n"
        );
    }

    #[test]
    fn returns_of_boolean_methods() {
        let source = "class A {\n    boolean f(boolean c) {\n        if (c) {\n            return true;\n        }\n        return false;\n    }\n    boolean g(boolean c, boolean e) {\n        if (c) return true;\n        return e;\n    }\n    boolean h(boolean c, boolean e) {\n        if (c) {\n            return e;\n        } else {\n            return false;\n        }\n    }\n    Boolean k(boolean c) {\n        if (c) return true;\n        return false;\n    }\n}\n";
        assert_eq!(
            run_rule(BooleanRule, source).text,
            "class A {\n    boolean f(boolean c) {\n        return c;\n    }\n    boolean g(boolean c, boolean e) {\n        return c || e;\n    }\n    boolean h(boolean c, boolean e) {\n        return c && e;\n    }\n    Boolean k(boolean c) {\n        if (c) return true;\n        return false;\n    }\n}\n"
        );
    }

    #[test]
    fn flag_set_by_a_following_if() {
        assert_eq!(
            clean("        boolean flag = false;\n        if (n > 0) {\n            flag = true;\n        }\n        use(flag);\n"),
            "        boolean flag = n > 0;\n        use(flag);\n"
        );
        assert_eq!(
            clean("        x = true;\n        if (b) x = false;\n"),
            "        x = !b;\n"
        );
        let reads_itself = "        x = false;\n        if (x || b) x = true;\n";
        assert_eq!(clean(reads_itself), reads_itself);
    }

    #[test]
    fn value_of_a_literal_is_the_constant() {
        assert_eq!(
            clean("        boxed = Boolean.valueOf(true);\n"),
            "        boxed = Boolean.TRUE;\n"
        );
    }
}
