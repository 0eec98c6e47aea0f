//! Finds the parts of an expression that must survive when the expression's
//! value is no longer needed.

use jclean_ast::{Ast, NodeId, NodeKind, TextRangeExt, TypeOracle};

use crate::rule::RuleError;

/// Calls known not to change observable state, by method name.
const PURE_METHODS: &[&str] = &[
    "equals",
    "hashCode",
    "contains",
    "containsAll",
    "matches",
    "exists",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideEffectPolicy {
    /// Treat `get*` calls as pure. `getAnd*` mutators stay side-effecting.
    pub trust_getters: bool,
}

impl SideEffectPolicy {
    pub fn is_pure_method(&self, name: &str) -> bool {
        if PURE_METHODS.contains(&name) || is_predicate_name(name) {
            return true;
        }
        if name.starts_with("getAnd") {
            return false;
        }
        self.trust_getters && name.starts_with("get")
    }
}

/// `is`, `isEmpty`, `isValid`; not `issue`.
fn is_predicate_name(name: &str) -> bool {
    match name.strip_prefix("is") {
        Some(rest) => rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_uppercase()),
        None => false,
    }
}

/// Side-effecting subexpressions of `expr`, outermost first, in source order.
///
/// A side-effecting call, assignment or increment is reported whole; its
/// operands are not searched further.
pub fn collect_side_effects(
    ast: &Ast,
    oracle: &dyn TypeOracle,
    policy: SideEffectPolicy,
    expr: NodeId,
) -> Result<Vec<NodeId>, RuleError> {
    if !ast.is_expression(expr) {
        return Err(RuleError::UnsupportedConstruct {
            offset: ast.range(expr).start_offset(),
            what: format!("side effects of a {}", ast.kind(expr).kind_name()),
        });
    }
    let mut out = Vec::new();
    collect(ast, oracle, policy, expr, &mut out);
    Ok(out)
}

pub fn has_side_effects(
    ast: &Ast,
    oracle: &dyn TypeOracle,
    policy: SideEffectPolicy,
    expr: NodeId,
) -> Result<bool, RuleError> {
    collect_side_effects(ast, oracle, policy, expr).map(|found| !found.is_empty())
}

fn collect(
    ast: &Ast,
    oracle: &dyn TypeOracle,
    policy: SideEffectPolicy,
    node: NodeId,
    out: &mut Vec<NodeId>,
) {
    let effectful = match ast.kind(node) {
        NodeKind::MethodCall { name, .. } => match oracle.method_of(node) {
            Some(_) => !ast
                .identifier(*name)
                .is_some_and(|name| policy.is_pure_method(name)),
            None => true,
        },
        NodeKind::SuperMethodCall { .. }
        | NodeKind::New { .. }
        | NodeKind::Assign { .. }
        | NodeKind::Postfix { .. }
        | NodeKind::VarDeclExpr { .. } => true,
        NodeKind::Prefix { op, .. } => op.is_update(),
        // Type names, declarations: nothing evaluates.
        NodeKind::TypeRef { .. } => return,
        _ => false,
    };
    if effectful {
        out.push(node);
        return;
    }
    for child in ast.children(node) {
        collect(ast, oracle, policy, child, out);
    }
}

/// No calls, assignments, increments or instance creations anywhere in `expr`.
pub fn is_passive(ast: &Ast, expr: NodeId) -> bool {
    ast.preorder(expr).into_iter().all(|node| match ast.kind(node) {
        NodeKind::MethodCall { .. }
        | NodeKind::SuperMethodCall { .. }
        | NodeKind::New { .. }
        | NodeKind::Assign { .. }
        | NodeKind::Postfix { .. }
        | NodeKind::VarDeclExpr { .. } => false,
        NodeKind::Prefix { op, .. } => !op.is_update(),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_test_utils::{find_node, parse_fixture};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"import java.util.List;
import java.util.concurrent.atomic.AtomicInteger;
class A {
    int f;
    List<String> items;
    AtomicInteger counter;
    void m(String s, int i) {
        boolean a = items.isEmpty() && s.equals("x") && items.contains(s);
        boolean b = i++ > 0 || unknown() || (f = 3) > 2;
        boolean c = items.get(0).isEmpty();
        boolean d = counter.getAndIncrement() > counter.get();
        boolean e = new StringBuilder().length() > 0;
        boolean g = i > f && !a;
    }
}
"#;

    fn texts(policy: SideEffectPolicy, snippet: &str) -> Vec<String> {
        let unit = parse_fixture(SOURCE);
        let expr = find_node(&unit.ast, SOURCE, snippet);
        collect_side_effects(&unit.ast, unit.oracle.as_ref(), policy, expr)
            .expect("expression")
            .into_iter()
            .map(|id| unit.ast.text(id, SOURCE).to_string())
            .collect()
    }

    #[test]
    fn pure_calls_are_not_reported() {
        let found = texts(
            SideEffectPolicy::default(),
            r#"items.isEmpty() && s.equals("x") && items.contains(s)"#,
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn effects_are_reported_whole_in_source_order() {
        assert_eq!(
            texts(
                SideEffectPolicy::default(),
                "i++ > 0 || unknown() || (f = 3) > 2"
            ),
            vec!["i++", "unknown()", "f = 3"]
        );
    }

    #[test]
    fn getters_depend_on_policy_except_atomic_mutators() {
        let strict = SideEffectPolicy::default();
        let trusting = SideEffectPolicy {
            trust_getters: true,
        };
        assert_eq!(texts(strict, "items.get(0).isEmpty()"), vec!["items.get(0)"]);
        assert!(texts(trusting, "items.get(0).isEmpty()").is_empty());
        assert_eq!(
            texts(trusting, "counter.getAndIncrement() > counter.get()"),
            vec!["counter.getAndIncrement()"]
        );
        assert_eq!(
            texts(trusting, "new StringBuilder().length() > 0"),
            vec!["new StringBuilder().length()"]
        );
    }

    #[test]
    fn statements_are_unsupported() {
        let unit = parse_fixture(SOURCE);
        let decl = find_node(&unit.ast, SOURCE, "int f;");
        let err = collect_side_effects(
            &unit.ast,
            unit.oracle.as_ref(),
            SideEffectPolicy::default(),
            decl,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn passivity_is_stricter_than_purity() {
        let unit = parse_fixture(SOURCE);
        let ast = &unit.ast;
        assert!(!is_passive(ast, find_node(ast, SOURCE, "items.get(0).isEmpty()")));
        assert!(!is_passive(ast, find_node(ast, SOURCE, "(f = 3) > 2")));
        assert!(is_passive(ast, find_node(ast, SOURCE, "i > f && !a")));
    }
}
