//! Structural tree comparison with pluggable leaf decisions.
//!
//! [`TreeMatcher`] walks two subtrees in lockstep. Before comparing a pair of
//! nodes structurally it asks a [`MatchPolicy`], which may settle the pair on
//! its own: [`SameVariablesAndMethods`] insists on identical bindings,
//! [`BooleanPolicy`] pairs boolean constants of opposite value.

use std::mem;

use jclean_ast::{Ast, LiteralKind, NodeId, NodeKind, TypeOracle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Match,
    Mismatch,
    /// Compare kind, payload and children as usual.
    Structural,
}

pub trait MatchPolicy {
    fn decide(
        &mut self,
        ast: &Ast,
        oracle: &dyn TypeOracle,
        reference: NodeId,
        other: NodeId,
    ) -> Decision;
}

#[derive(Clone, Copy)]
pub struct TreeMatcher<'a> {
    ast: &'a Ast,
    oracle: &'a dyn TypeOracle,
}

impl<'a> TreeMatcher<'a> {
    pub fn new(ast: &'a Ast, oracle: &'a dyn TypeOracle) -> Self {
        Self { ast, oracle }
    }

    pub fn matches<P: MatchPolicy + ?Sized>(
        &self,
        policy: &mut P,
        reference: NodeId,
        other: NodeId,
    ) -> bool {
        match policy.decide(self.ast, self.oracle, reference, other) {
            Decision::Match => true,
            Decision::Mismatch => false,
            Decision::Structural => {
                same_shape(self.ast.kind(reference), self.ast.kind(other)) && {
                    let lhs = self.ast.children(reference);
                    let rhs = self.ast.children(other);
                    self.matches_all(policy, &lhs, &rhs)
                }
            }
        }
    }

    pub fn matches_all<P: MatchPolicy + ?Sized>(
        &self,
        policy: &mut P,
        reference: &[NodeId],
        other: &[NodeId],
    ) -> bool {
        reference.len() == other.len()
            && reference
                .iter()
                .zip(other)
                .all(|(a, b)| self.matches(policy, *a, *b))
    }
}

/// Same variant, same non-child payload, same optional-slot occupancy.
fn same_shape(a: &NodeKind, b: &NodeKind) -> bool {
    use NodeKind::*;
    match (a, b) {
        (CompilationUnit { package: p, .. }, CompilationUnit { package: q, .. }) => {
            p.is_some() == q.is_some()
        }
        (
            ImportDecl {
                is_static: s1,
                on_demand: d1,
                ..
            },
            ImportDecl {
                is_static: s2,
                on_demand: d2,
                ..
            },
        ) => s1 == s2 && d1 == d2,
        (
            TypeDecl {
                kind: k1,
                modifiers: m1,
                ..
            },
            TypeDecl {
                kind: k2,
                modifiers: m2,
                ..
            },
        ) => k1 == k2 && m1 == m2,
        (FieldDecl { modifiers: m1, .. }, FieldDecl { modifiers: m2, .. })
        | (LocalVarDecl { modifiers: m1, .. }, LocalVarDecl { modifiers: m2, .. })
        | (VarDeclExpr { modifiers: m1, .. }, VarDeclExpr { modifiers: m2, .. })
        | (Param { modifiers: m1, .. }, Param { modifiers: m2, .. }) => m1 == m2,
        (
            MethodDecl {
                modifiers: m1,
                return_type: r1,
                body: b1,
                ..
            },
            MethodDecl {
                modifiers: m2,
                return_type: r2,
                body: b2,
                ..
            },
        ) => m1 == m2 && r1.is_some() == r2.is_some() && b1.is_some() == b2.is_some(),
        (VarFragment { initializer: i1, .. }, VarFragment { initializer: i2, .. }) => {
            i1.is_some() == i2.is_some()
        }
        (TypeRef { text: t1 }, TypeRef { text: t2 }) => t1 == t2,
        (If { else_branch: e1, .. }, If { else_branch: e2, .. }) => e1.is_some() == e2.is_some(),
        (Return { expr: e1 }, Return { expr: e2 }) => e1.is_some() == e2.is_some(),
        (
            For {
                init: i1,
                condition: c1,
                updaters: u1,
                ..
            },
            For {
                init: i2,
                condition: c2,
                updaters: u2,
                ..
            },
        ) => i1.len() == i2.len() && c1.is_some() == c2.is_some() && u1.len() == u2.len(),
        (
            Try {
                resources: r1,
                catches: c1,
                finally: f1,
                ..
            },
            Try {
                resources: r2,
                catches: c2,
                finally: f2,
                ..
            },
        ) => r1.len() == r2.len() && c1.len() == c2.len() && f1.is_some() == f2.is_some(),
        (Break { label: l1 }, Break { label: l2 })
        | (Continue { label: l1 }, Continue { label: l2 }) => l1 == l2,
        (Labeled { label: l1, .. }, Labeled { label: l2, .. }) => l1 == l2,
        (Literal { kind: k1, text: t1 }, Literal { kind: k2, text: t2 }) => k1 == k2 && t1 == t2,
        (SimpleName { ident: i1 }, SimpleName { ident: i2 }) => i1 == i2,
        (This { qualifier: q1 }, This { qualifier: q2 })
        | (SuperFieldAccess { qualifier: q1, .. }, SuperFieldAccess { qualifier: q2, .. })
        | (SuperMethodCall { qualifier: q1, .. }, SuperMethodCall { qualifier: q2, .. })
        | (MethodCall { receiver: q1, .. }, MethodCall { receiver: q2, .. })
        | (New { outer: q1, .. }, New { outer: q2, .. }) => q1.is_some() == q2.is_some(),
        (
            ArrayCreation {
                dimensions: d1,
                initializer: i1,
                ..
            },
            ArrayCreation {
                dimensions: d2,
                initializer: i2,
                ..
            },
        ) => d1.len() == d2.len() && i1.is_some() == i2.is_some(),
        (Assign { op: o1, .. }, Assign { op: o2, .. }) => o1 == o2,
        (Infix { op: o1, .. }, Infix { op: o2, .. }) => o1 == o2,
        (Prefix { op: o1, .. }, Prefix { op: o2, .. }) => o1 == o2,
        (Postfix { op: o1, .. }, Postfix { op: o2, .. }) => o1 == o2,
        _ => mem::discriminant(a) == mem::discriminant(b),
    }
}

/// Plain structural equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralPolicy;

impl MatchPolicy for StructuralPolicy {
    fn decide(&mut self, _: &Ast, _: &dyn TypeOracle, _: NodeId, _: NodeId) -> Decision {
        Decision::Structural
    }
}

/// Structural equality where names must denote the same variable and calls the
/// same method.
#[derive(Debug, Default, Clone, Copy)]
pub struct SameVariablesAndMethods;

impl MatchPolicy for SameVariablesAndMethods {
    fn decide(
        &mut self,
        ast: &Ast,
        oracle: &dyn TypeOracle,
        reference: NodeId,
        other: NodeId,
    ) -> Decision {
        match (ast.kind(reference), ast.kind(other)) {
            (NodeKind::SimpleName { .. }, NodeKind::SimpleName { .. }) => {
                match (oracle.variable_of(reference), oracle.variable_of(other)) {
                    (Some(a), Some(b)) if a.id == b.id => Decision::Match,
                    (None, None) => Decision::Structural,
                    _ => Decision::Mismatch,
                }
            }
            (NodeKind::MethodCall { .. }, NodeKind::MethodCall { .. })
            | (NodeKind::SuperMethodCall { .. }, NodeKind::SuperMethodCall { .. })
            | (NodeKind::New { .. }, NodeKind::New { .. }) => {
                match (oracle.method_of(reference), oracle.method_of(other)) {
                    (Some(a), Some(b)) if a != b => Decision::Mismatch,
                    (Some(_), None) | (None, Some(_)) => Decision::Mismatch,
                    _ => Decision::Structural,
                }
            }
            _ => Decision::Structural,
        }
    }
}

/// Pairings found by one [`BooleanPolicy`] pass: reference node to the node
/// it was matched against.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchState {
    pairs: Vec<(NodeId, NodeId)>,
}

impl MatchState {
    pub fn contains(&self, reference: NodeId, other: NodeId) -> bool {
        self.pairs.contains(&(reference, other))
    }

    pub fn references(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pairs.iter().map(|(reference, _)| *reference)
    }

    pub fn pairs(&self) -> &[(NodeId, NodeId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn record(&mut self, reference: NodeId, other: NodeId) {
        if !self.contains(reference, other) {
            self.pairs.push((reference, other));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Literal,
    Name,
}

/// Matches branches that differ only by boolean constants of opposite value.
///
/// On the reference side a `true`/`false` literal, `Boolean.TRUE`/`FALSE` or a
/// name holding a boolean constant matches any expression on the other side
/// whose constant value is the opposite. Identical constants do not match.
#[derive(Debug, Default)]
pub struct BooleanPolicy<'p> {
    state: MatchState,
    previous: Option<&'p MatchState>,
}

impl<'p> BooleanPolicy<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second pass that accepts name sites only as `previous` paired them.
    pub fn reusing(previous: &'p MatchState) -> Self {
        Self {
            state: MatchState::default(),
            previous: Some(previous),
        }
    }

    pub fn into_state(self) -> MatchState {
        self.state
    }

    fn site(ast: &Ast, oracle: &dyn TypeOracle, node: NodeId) -> Option<(bool, Site)> {
        match ast.kind(node) {
            NodeKind::Literal {
                kind: LiteralKind::Boolean(value),
                ..
            } => Some((*value, Site::Literal)),
            NodeKind::QualifiedName { .. } | NodeKind::FieldAccess { .. }
                if ast.is_boolean_constant_field(node) =>
            {
                ast.boolean_literal_value(node).map(|v| (v, Site::Name))
            }
            NodeKind::SimpleName { .. } | NodeKind::QualifiedName { .. } => {
                let binding = oracle.variable_of(node)?;
                if !binding.ty.is_boolean_like() {
                    return None;
                }
                let value = oracle.constant_value(node)?.as_bool()?;
                Some((value, Site::Name))
            }
            _ => None,
        }
    }
}

fn boolean_value(ast: &Ast, oracle: &dyn TypeOracle, expr: NodeId) -> Option<bool> {
    ast.boolean_literal_value(expr)
        .or_else(|| oracle.constant_value(expr)?.as_bool())
}

impl MatchPolicy for BooleanPolicy<'_> {
    fn decide(
        &mut self,
        ast: &Ast,
        oracle: &dyn TypeOracle,
        reference: NodeId,
        other: NodeId,
    ) -> Decision {
        if !ast.is_expression(reference) {
            return Decision::Structural;
        }
        let Some((value, site)) = Self::site(ast, oracle, reference) else {
            return Decision::Structural;
        };
        if !ast.is_expression(other) {
            return Decision::Mismatch;
        }

        let accepted = match (site, self.previous) {
            (Site::Name, Some(previous)) => previous.contains(reference, other),
            _ => boolean_value(ast, oracle, other) == Some(!value),
        };
        if accepted {
            self.state.record(reference, other);
            Decision::Match
        } else {
            Decision::Mismatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_test_utils::{find_node, parse_fixture};

    fn branches(ast: &Ast, source: &str, snippet: &str) -> (NodeId, NodeId) {
        match ast.kind(find_node(ast, source, snippet)) {
            NodeKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => (*then_branch, *else_branch),
            other => panic!("expected if/else, got {other:?}"),
        }
    }

    #[test]
    fn boolean_policy_pairs_opposite_constants() {
        let source = "class A { boolean x; void m(boolean b) { if (b) { x = true; } else { x = false; } } }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let (then_branch, else_branch) =
            branches(ast, source, "if (b) { x = true; } else { x = false; }");
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());

        let mut first = BooleanPolicy::new();
        assert!(matcher.matches(&mut first, then_branch, else_branch));
        let state = first.into_state();
        assert_eq!(state.len(), 1);
        let site = state.references().next().expect("one site");
        assert_eq!(ast.text(site, source), "true");

        let mut second = BooleanPolicy::reusing(&state);
        assert!(matcher.matches(&mut second, then_branch, else_branch));
        assert_eq!(second.into_state(), state);
    }

    #[test]
    fn boolean_policy_rejects_equal_constants_and_statements() {
        let source = "class A { boolean x, y; void m(boolean b) { if (b) { x = true; y = true; } else { x = false; y = true; } if (b) { x = true; } else { return; } } }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());

        let (t, e) = branches(
            ast,
            source,
            "if (b) { x = true; y = true; } else { x = false; y = true; }",
        );
        assert!(!matcher.matches(&mut BooleanPolicy::new(), t, e));

        let (t, e) = branches(ast, source, "if (b) { x = true; } else { return; }");
        assert!(!matcher.matches(&mut BooleanPolicy::new(), t, e));
    }

    #[test]
    fn boolean_wrapper_constants_are_sites() {
        let source = "class A { Boolean x; void m(boolean b) { if (b) { x = Boolean.TRUE; } else { x = Boolean.FALSE; } } }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let (t, e) = branches(
            ast,
            source,
            "if (b) { x = Boolean.TRUE; } else { x = Boolean.FALSE; }",
        );
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());
        let mut policy = BooleanPolicy::new();
        assert!(matcher.matches(&mut policy, t, e));
        let state = policy.into_state();
        let site = state.references().next().expect("one site");
        assert_eq!(ast.text(site, source), "Boolean.TRUE");
    }

    #[test]
    fn same_variables_distinguishes_shadowed_locals() {
        let source = "class A { int f; void m(boolean c) { if (c) { int v = 1; use(v); f++; } else { int v = 2; use(v); f++; } } void use(int i) {} }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());
        let (t, e) = branches(
            ast,
            source,
            "if (c) { int v = 1; use(v); f++; } else { int v = 2; use(v); f++; }",
        );
        let lhs = ast.statements_of(Some(t));
        let rhs = ast.statements_of(Some(e));

        let mut policy = SameVariablesAndMethods;
        assert!(!matcher.matches(&mut policy, lhs[1], rhs[1]));
        assert!(matcher.matches(&mut policy, lhs[2], rhs[2]));
        assert!(matcher.matches(&mut StructuralPolicy, lhs[1], rhs[1]));
    }
}
