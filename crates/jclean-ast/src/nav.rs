//! Navigation helpers shared by the cleanup rules.

use crate::ops::{InfixOp, LiteralKind};
use crate::{Ast, NodeId, NodeKind};

impl Ast {
    /// Statements of a branch: the contents of a block, or the statement itself.
    pub fn statements_of(&self, stmt: Option<NodeId>) -> Vec<NodeId> {
        match stmt {
            None => Vec::new(),
            Some(id) => match self.kind(id) {
                NodeKind::Block { statements } => statements.clone(),
                _ => vec![id],
            },
        }
    }

    pub fn block_statements(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.kind(id) {
            NodeKind::Block { statements } => Some(statements),
            _ => None,
        }
    }

    /// Position of `stmt` in its parent block.
    fn index_in_block(&self, stmt: NodeId) -> Option<(&[NodeId], usize)> {
        let parent = self.parent(stmt)?;
        let statements = self.block_statements(parent)?;
        let idx = statements.iter().position(|s| *s == stmt)?;
        Some((statements, idx))
    }

    pub fn next_sibling(&self, stmt: NodeId) -> Option<NodeId> {
        let (statements, idx) = self.index_in_block(stmt)?;
        statements.get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, stmt: NodeId) -> Option<NodeId> {
        let (statements, idx) = self.index_in_block(stmt)?;
        idx.checked_sub(1).map(|i| statements[i])
    }

    /// Statements after `stmt` in its parent block.
    pub fn following_siblings(&self, stmt: NodeId) -> Vec<NodeId> {
        match self.index_in_block(stmt) {
            Some((statements, idx)) => statements[idx + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Proper ancestors, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    pub fn enclosing(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|a| pred(self.kind(*a)))
    }

    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, |k| matches!(k, NodeKind::MethodDecl { .. }))
    }

    /// Strips any number of parentheses.
    pub fn unparenthesize(&self, mut expr: NodeId) -> NodeId {
        while let NodeKind::Paren { expr: inner } = self.kind(expr) {
            expr = *inner;
        }
        expr
    }

    /// `true`, `false`, `Boolean.TRUE` or `Boolean.FALSE`.
    pub fn boolean_literal_value(&self, expr: NodeId) -> Option<bool> {
        let expr = self.unparenthesize(expr);
        match self.kind(expr) {
            NodeKind::Literal {
                kind: LiteralKind::Boolean(value),
                ..
            } => Some(*value),
            NodeKind::QualifiedName { qualifier, name }
            | NodeKind::FieldAccess {
                target: qualifier,
                name,
            } => {
                let qualifier = self.qualified_name(*qualifier)?;
                if qualifier != "Boolean" && qualifier != "java.lang.Boolean" {
                    return None;
                }
                match self.identifier(*name)? {
                    "TRUE" => Some(true),
                    "FALSE" => Some(false),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// `Boolean.TRUE` or `Boolean.FALSE` (not the primitive literals).
    pub fn is_boolean_constant_field(&self, expr: NodeId) -> bool {
        let expr = self.unparenthesize(expr);
        !matches!(self.kind(expr), NodeKind::Literal { .. })
            && self.boolean_literal_value(expr).is_some()
    }

    pub fn is_null_literal(&self, expr: NodeId) -> bool {
        matches!(
            self.kind(self.unparenthesize(expr)),
            NodeKind::Literal {
                kind: LiteralKind::Null,
                ..
            }
        )
    }

    /// Identifier of a simple name, or the last segment of a qualified name.
    pub fn identifier(&self, name: NodeId) -> Option<&str> {
        match self.kind(name) {
            NodeKind::SimpleName { ident } => Some(ident),
            NodeKind::QualifiedName { name, .. } => self.identifier(*name),
            _ => None,
        }
    }

    /// Dotted text of a name or a chain of field accesses on names.
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::SimpleName { ident } => Some(ident.clone()),
            NodeKind::QualifiedName { qualifier, name }
            | NodeKind::FieldAccess {
                target: qualifier,
                name,
            } => {
                let mut out = self.qualified_name(*qualifier)?;
                out.push('.');
                out.push_str(self.identifier(*name)?);
                Some(out)
            }
            _ => None,
        }
    }

    /// Whether `expr` is an infix expression using one of `ops`.
    pub fn has_operator(&self, expr: NodeId, ops: &[InfixOp]) -> bool {
        match self.kind(self.unparenthesize(expr)) {
            NodeKind::Infix { op, .. } => ops.contains(op),
            _ => false,
        }
    }

    pub fn is_else_branch(&self, stmt: NodeId) -> bool {
        self.parent(stmt).is_some_and(|p| {
            matches!(self.kind(p), NodeKind::If { else_branch: Some(e), .. } if *e == stmt)
        })
    }

    /// Whether control never falls through the end of `stmt`.
    pub fn ends_with_jump(&self, stmt: NodeId) -> bool {
        match self.kind(stmt) {
            NodeKind::Return { .. }
            | NodeKind::Throw { .. }
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. } => true,
            NodeKind::Block { statements } => statements
                .last()
                .is_some_and(|last| self.ends_with_jump(*last)),
            NodeKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => self.ends_with_jump(*then_branch) && self.ends_with_jump(*else_branch),
            _ => false,
        }
    }

    /// Whether a branch holds no statements at all.
    pub fn is_empty_branch(&self, stmt: NodeId) -> bool {
        match self.kind(stmt) {
            NodeKind::Empty => true,
            NodeKind::Block { statements } => statements.iter().all(|s| self.is_empty_branch(*s)),
            _ => false,
        }
    }

    /// Names declared directly by a statement (`int a, b;` yields `a` and `b`).
    pub fn declared_names(&self, stmt: NodeId) -> Vec<&str> {
        match self.kind(stmt) {
            NodeKind::LocalVarDecl { fragments, .. } | NodeKind::VarDeclExpr { fragments, .. } => {
                fragments
                    .iter()
                    .filter_map(|f| match self.kind(*f) {
                        NodeKind::VarFragment { name, .. } => self.identifier(*name),
                        _ => None,
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AstBuilder, TextRange, TextRangeExt};
    use pretty_assertions::assert_eq;

    fn leaf(b: &mut AstBuilder, kind: NodeKind, start: usize, len: usize) -> NodeId {
        b.alloc(kind, TextRange::from_len(start, len))
    }

    fn simple(b: &mut AstBuilder, ident: &str, start: usize) -> NodeId {
        leaf(
            b,
            NodeKind::SimpleName {
                ident: ident.into(),
            },
            start,
            ident.len(),
        )
    }

    #[test]
    fn boolean_constants_cover_wrapper_fields() {
        // (Boolean.FALSE)
        let mut b = AstBuilder::new();
        let q = simple(&mut b, "Boolean", 1);
        let n = simple(&mut b, "FALSE", 9);
        let qn = leaf(
            &mut b,
            NodeKind::QualifiedName {
                qualifier: q,
                name: n,
            },
            1,
            13,
        );
        let paren = leaf(&mut b, NodeKind::Paren { expr: qn }, 0, 15);
        let ast = b.finish(paren);

        assert_eq!(ast.boolean_literal_value(paren), Some(false));
        assert!(ast.is_boolean_constant_field(paren));
        assert_eq!(ast.qualified_name(qn).as_deref(), Some("Boolean.FALSE"));
        assert_eq!(ast.identifier(qn), Some("FALSE"));
        assert_eq!(ast.unparenthesize(paren), qn);
    }

    #[test]
    fn siblings_within_block() {
        // { ; return; }
        let mut b = AstBuilder::new();
        let empty = leaf(&mut b, NodeKind::Empty, 2, 1);
        let ret = leaf(&mut b, NodeKind::Return { expr: None }, 4, 7);
        let block = leaf(
            &mut b,
            NodeKind::Block {
                statements: vec![empty, ret],
            },
            0,
            13,
        );
        let ast = b.finish(block);

        assert_eq!(ast.next_sibling(empty), Some(ret));
        assert_eq!(ast.previous_sibling(ret), Some(empty));
        assert_eq!(ast.previous_sibling(empty), None);
        assert_eq!(ast.following_siblings(empty), vec![ret]);
        assert_eq!(ast.statements_of(Some(block)), vec![empty, ret]);
        assert_eq!(ast.statements_of(Some(ret)), vec![ret]);
        assert!(ast.ends_with_jump(block));
        assert!(!ast.is_empty_branch(block));
        assert!(ast.is_empty_branch(empty));
        assert_eq!(ast.ancestors(ret).collect::<Vec<_>>(), vec![block]);
    }
}
