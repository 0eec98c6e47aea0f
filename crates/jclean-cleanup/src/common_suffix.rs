//! Longest run of trailing statements shared by every branch of an
//! `if`/`else if`/`else` chain.

use jclean_ast::{Ast, NodeId, NodeKind};

use crate::matcher::{SameVariablesAndMethods, TreeMatcher};
use crate::side_effects::is_passive;

/// An `if` chain that ends in an unconditional `else`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfChain {
    /// `ifs[i]` guards `cases[i]`; the last case is the final `else`.
    pub ifs: Vec<NodeId>,
    pub cases: Vec<Vec<NodeId>>,
}

impl IfChain {
    pub fn head(&self) -> NodeId {
        self.ifs[0]
    }

    /// The branch statement holding case `i`.
    pub fn branch(&self, ast: &Ast, i: usize) -> Option<NodeId> {
        let owner = *self.ifs.get(i).or_else(|| self.ifs.last())?;
        match ast.kind(owner) {
            NodeKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                if i < self.ifs.len() {
                    Some(*then_branch)
                } else {
                    *else_branch
                }
            }
            _ => None,
        }
    }

    pub fn condition(&self, ast: &Ast, i: usize) -> Option<NodeId> {
        match ast.kind(*self.ifs.get(i)?) {
            NodeKind::If { condition, .. } => Some(*condition),
            _ => None,
        }
    }
}

/// Gathers branch statement lists through `else if` links.
///
/// `None` when a branch is empty or the chain has no final `else`.
pub fn collect_cases(ast: &Ast, if_stmt: NodeId) -> Option<IfChain> {
    let mut ifs = Vec::new();
    let mut cases = Vec::new();
    let mut current = if_stmt;
    loop {
        let NodeKind::If {
            then_branch,
            else_branch,
            ..
        } = ast.kind(current)
        else {
            return None;
        };
        let then_stmts = ast.statements_of(Some(*then_branch));
        if then_stmts.is_empty() {
            return None;
        }
        ifs.push(current);
        cases.push(then_stmts);

        let else_branch = (*else_branch)?;
        if matches!(ast.kind(else_branch), NodeKind::If { .. }) {
            current = else_branch;
            continue;
        }
        let else_stmts = ast.statements_of(Some(else_branch));
        if else_stmts.is_empty() {
            return None;
        }
        cases.push(else_stmts);
        return Some(IfChain { ifs, cases });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixPlan {
    pub chain: IfChain,
    /// The shared statements as they appear in the first case, in source order.
    pub common: Vec<NodeId>,
    /// Per case: every statement of the case is shared, and dropping it skips
    /// no condition with side effects.
    pub removable: Vec<bool>,
    /// Per case: the shared statements to delete from it.
    pub shared: Vec<Vec<NodeId>>,
}

impl SuffixPlan {
    pub fn all_removable(&self) -> bool {
        self.removable.iter().all(|r| *r)
    }
}

/// Finds the common suffix of `chain`; `None` when there is none.
pub fn plan(ast: &Ast, matcher: &TreeMatcher<'_>, chain: IfChain) -> Option<SuffixPlan> {
    let shortest = chain.cases.iter().map(Vec::len).min()?;
    let mut count = 0;
    for k in 1..=shortest {
        let candidates: Vec<NodeId> = chain.cases.iter().map(|c| c[c.len() - k]).collect();
        if !all_match(matcher, &candidates, 0, candidates.len()) {
            break;
        }
        count = k;
    }
    if count == 0 {
        return None;
    }

    let shared: Vec<Vec<NodeId>> = chain
        .cases
        .iter()
        .map(|c| c[c.len() - count..].to_vec())
        .collect();
    let removable = chain
        .cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            case.len() == count
                && chain
                    .condition(ast, i)
                    .map_or(true, |condition| is_passive(ast, condition))
        })
        .collect();
    Some(SuffixPlan {
        common: shared[0].clone(),
        chain,
        removable,
        shared,
    })
}

/// Pairwise equivalence of `stmts[start..end]` by halving.
fn all_match(matcher: &TreeMatcher<'_>, stmts: &[NodeId], start: usize, end: usize) -> bool {
    let mut policy = SameVariablesAndMethods;
    match end - start {
        0 | 1 => true,
        2 => matcher.matches(&mut policy, stmts[start], stmts[start + 1]),
        _ => {
            let pivot = (start + end + 1) / 2;
            all_match(matcher, stmts, start, pivot)
                && all_match(matcher, stmts, pivot, end)
                && matcher.matches(&mut policy, stmts[start], stmts[pivot])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_test_utils::{find_node, parse_fixture};
    use pretty_assertions::assert_eq;

    fn texts(ast: &Ast, source: &str, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| ast.text(*id, source).to_string()).collect()
    }

    #[test]
    fn finds_the_shared_tail_of_a_chain() {
        let source = "class A { void m(boolean a, boolean b) { if (a) { p(); q(); } else if (b) { r(); q(); } else { s(); q(); } } void p() {} void q() {} void r() {} void s() {} }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let head = find_node(
            ast,
            source,
            "if (a) { p(); q(); } else if (b) { r(); q(); } else { s(); q(); }",
        );
        let chain = collect_cases(ast, head).expect("complete chain");
        assert_eq!(chain.ifs.len(), 2);
        assert_eq!(chain.cases.len(), 3);

        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());
        let plan = plan(ast, &matcher, chain).expect("common suffix");
        assert_eq!(texts(ast, source, &plan.common), vec!["q();"]);
        assert_eq!(plan.removable, vec![false, false, false]);
        assert_eq!(texts(ast, source, &plan.shared[2]), vec!["q();"]);
    }

    #[test]
    fn fully_shared_cases_are_removable_only_behind_passive_conditions() {
        let source = "class A { int x; void m(boolean a) { if (a) { x = 1; } else if (check()) { x = 1; } else { x = 1; } } boolean check() { return true; } }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let head = find_node(
            ast,
            source,
            "if (a) { x = 1; } else if (check()) { x = 1; } else { x = 1; }",
        );
        let chain = collect_cases(ast, head).expect("complete chain");
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());
        let plan = plan(ast, &matcher, chain).expect("common suffix");
        assert_eq!(plan.removable, vec![true, false, true]);
        assert!(!plan.all_removable());
    }

    #[test]
    fn incomplete_or_empty_chains_are_rejected() {
        let source = "class A { void m(boolean a) { if (a) { p(); } if (a) { } else { p(); } } void p() {} }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        assert!(collect_cases(ast, find_node(ast, source, "if (a) { p(); }")).is_none());
        assert!(collect_cases(ast, find_node(ast, source, "if (a) { } else { p(); }")).is_none());
    }

    #[test]
    fn different_callees_do_not_match() {
        let source = "class A { void m(boolean a) { if (a) { p(); } else { r(); } } void p() {} void r() {} }";
        let unit = parse_fixture(source);
        let ast = &unit.ast;
        let chain =
            collect_cases(ast, find_node(ast, source, "if (a) { p(); } else { r(); }")).expect("chain");
        let matcher = TreeMatcher::new(ast, unit.oracle.as_ref());
        assert!(plan(ast, &matcher, chain).is_none());
    }
}
