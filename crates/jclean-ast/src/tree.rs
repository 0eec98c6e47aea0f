use std::fmt;

use jclean_core::{TextRange, TextRangeExt};

use crate::ops::{AssignOp, InfixOp, LiteralKind, Modifiers, PostfixOp, PrefixOp, TypeDeclKind};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(u32);

impl CommentId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommentId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// ...` up to (not including) the line terminator.
    Line,
    /// `/* ... */`
    Block,
    /// `/** ... */`
    Javadoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub parent: Option<NodeId>,
}

/// Every syntax shape the cleanup rules understand.
///
/// Child slots hold [`NodeId`]s into the owning [`Ast`]. Identifier-like leaves
/// (labels, type text) are stored inline.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    CompilationUnit {
        package: Option<NodeId>,
        imports: Vec<NodeId>,
        types: Vec<NodeId>,
    },
    PackageDecl {
        name: NodeId,
    },
    ImportDecl {
        name: NodeId,
        is_static: bool,
        on_demand: bool,
    },
    TypeDecl {
        kind: TypeDeclKind,
        modifiers: Modifiers,
        name: NodeId,
        members: Vec<NodeId>,
    },
    FieldDecl {
        modifiers: Modifiers,
        ty: NodeId,
        fragments: Vec<NodeId>,
    },
    /// `return_type` is `None` for constructors.
    MethodDecl {
        modifiers: Modifiers,
        return_type: Option<NodeId>,
        name: NodeId,
        params: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Param {
        modifiers: Modifiers,
        ty: NodeId,
        name: NodeId,
    },
    VarFragment {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    /// A type as written, e.g. `List<String>` or `int[]`.
    TypeRef {
        text: String,
    },

    Block {
        statements: Vec<NodeId>,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    LocalVarDecl {
        modifiers: Modifiers,
        ty: NodeId,
        fragments: Vec<NodeId>,
    },
    Return {
        expr: Option<NodeId>,
    },
    For {
        init: Vec<NodeId>,
        condition: Option<NodeId>,
        updaters: Vec<NodeId>,
        body: NodeId,
    },
    ForEach {
        param: NodeId,
        iterable: NodeId,
        body: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Do {
        body: NodeId,
        condition: NodeId,
    },
    Try {
        resources: Vec<NodeId>,
        body: NodeId,
        catches: Vec<NodeId>,
        finally: Option<NodeId>,
    },
    Catch {
        param: NodeId,
        body: NodeId,
    },
    Throw {
        expr: NodeId,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Empty,
    Labeled {
        label: String,
        body: NodeId,
    },

    /// `text` is the literal exactly as it appears in the source.
    Literal {
        kind: LiteralKind,
        text: String,
    },
    SimpleName {
        ident: String,
    },
    QualifiedName {
        qualifier: NodeId,
        name: NodeId,
    },
    This {
        qualifier: Option<NodeId>,
    },
    FieldAccess {
        target: NodeId,
        name: NodeId,
    },
    SuperFieldAccess {
        qualifier: Option<NodeId>,
        name: NodeId,
    },
    MethodCall {
        receiver: Option<NodeId>,
        name: NodeId,
        args: Vec<NodeId>,
    },
    SuperMethodCall {
        qualifier: Option<NodeId>,
        name: NodeId,
        args: Vec<NodeId>,
    },
    New {
        outer: Option<NodeId>,
        ty: NodeId,
        args: Vec<NodeId>,
    },
    ArrayAccess {
        array: NodeId,
        index: NodeId,
    },
    ArrayCreation {
        ty: NodeId,
        dimensions: Vec<NodeId>,
        initializer: Option<NodeId>,
    },
    ArrayInit {
        elements: Vec<NodeId>,
    },
    Assign {
        op: AssignOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    /// Left-associative chain `a op b op c ...`; always at least two operands.
    Infix {
        op: InfixOp,
        operands: Vec<NodeId>,
    },
    Prefix {
        op: PrefixOp,
        operand: NodeId,
    },
    Postfix {
        op: PostfixOp,
        operand: NodeId,
    },
    Cast {
        ty: NodeId,
        expr: NodeId,
    },
    InstanceOf {
        expr: NodeId,
        ty: NodeId,
    },
    Paren {
        expr: NodeId,
    },
    /// Declarations in `for` initializers and `try` resources.
    VarDeclExpr {
        modifiers: Modifiers,
        ty: NodeId,
        fragments: Vec<NodeId>,
    },
}

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::CompilationUnit { .. } => "CompilationUnit",
            NodeKind::PackageDecl { .. } => "PackageDecl",
            NodeKind::ImportDecl { .. } => "ImportDecl",
            NodeKind::TypeDecl { .. } => "TypeDecl",
            NodeKind::FieldDecl { .. } => "FieldDecl",
            NodeKind::MethodDecl { .. } => "MethodDecl",
            NodeKind::Param { .. } => "Param",
            NodeKind::VarFragment { .. } => "VarFragment",
            NodeKind::TypeRef { .. } => "TypeRef",
            NodeKind::Block { .. } => "Block",
            NodeKind::If { .. } => "If",
            NodeKind::ExprStmt { .. } => "ExprStmt",
            NodeKind::LocalVarDecl { .. } => "LocalVarDecl",
            NodeKind::Return { .. } => "Return",
            NodeKind::For { .. } => "For",
            NodeKind::ForEach { .. } => "ForEach",
            NodeKind::While { .. } => "While",
            NodeKind::Do { .. } => "Do",
            NodeKind::Try { .. } => "Try",
            NodeKind::Catch { .. } => "Catch",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Break { .. } => "Break",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Empty => "Empty",
            NodeKind::Labeled { .. } => "Labeled",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::SimpleName { .. } => "SimpleName",
            NodeKind::QualifiedName { .. } => "QualifiedName",
            NodeKind::This { .. } => "This",
            NodeKind::FieldAccess { .. } => "FieldAccess",
            NodeKind::SuperFieldAccess { .. } => "SuperFieldAccess",
            NodeKind::MethodCall { .. } => "MethodCall",
            NodeKind::SuperMethodCall { .. } => "SuperMethodCall",
            NodeKind::New { .. } => "New",
            NodeKind::ArrayAccess { .. } => "ArrayAccess",
            NodeKind::ArrayCreation { .. } => "ArrayCreation",
            NodeKind::ArrayInit { .. } => "ArrayInit",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::Infix { .. } => "Infix",
            NodeKind::Prefix { .. } => "Prefix",
            NodeKind::Postfix { .. } => "Postfix",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::InstanceOf { .. } => "InstanceOf",
            NodeKind::Paren { .. } => "Paren",
            NodeKind::VarDeclExpr { .. } => "VarDeclExpr",
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Block { .. }
                | NodeKind::If { .. }
                | NodeKind::ExprStmt { .. }
                | NodeKind::LocalVarDecl { .. }
                | NodeKind::Return { .. }
                | NodeKind::For { .. }
                | NodeKind::ForEach { .. }
                | NodeKind::While { .. }
                | NodeKind::Do { .. }
                | NodeKind::Try { .. }
                | NodeKind::Throw { .. }
                | NodeKind::Break { .. }
                | NodeKind::Continue { .. }
                | NodeKind::Empty
                | NodeKind::Labeled { .. }
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Literal { .. }
                | NodeKind::SimpleName { .. }
                | NodeKind::QualifiedName { .. }
                | NodeKind::This { .. }
                | NodeKind::FieldAccess { .. }
                | NodeKind::SuperFieldAccess { .. }
                | NodeKind::MethodCall { .. }
                | NodeKind::SuperMethodCall { .. }
                | NodeKind::New { .. }
                | NodeKind::ArrayAccess { .. }
                | NodeKind::ArrayCreation { .. }
                | NodeKind::ArrayInit { .. }
                | NodeKind::Assign { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::Infix { .. }
                | NodeKind::Prefix { .. }
                | NodeKind::Postfix { .. }
                | NodeKind::Cast { .. }
                | NodeKind::InstanceOf { .. }
                | NodeKind::Paren { .. }
                | NodeKind::VarDeclExpr { .. }
        )
    }

    pub fn is_body_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::TypeDecl { .. } | NodeKind::FieldDecl { .. } | NodeKind::MethodDecl { .. }
        )
    }

    /// Children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
            } => {
                out.extend(package);
                out.extend(imports);
                out.extend(types);
            }
            NodeKind::PackageDecl { name } | NodeKind::ImportDecl { name, .. } => out.push(*name),
            NodeKind::TypeDecl { name, members, .. } => {
                out.push(*name);
                out.extend(members);
            }
            NodeKind::FieldDecl { ty, fragments, .. }
            | NodeKind::LocalVarDecl { ty, fragments, .. }
            | NodeKind::VarDeclExpr { ty, fragments, .. } => {
                out.push(*ty);
                out.extend(fragments);
            }
            NodeKind::MethodDecl {
                return_type,
                name,
                params,
                body,
                ..
            } => {
                out.extend(return_type);
                out.push(*name);
                out.extend(params);
                out.extend(body);
            }
            NodeKind::Param { ty, name, .. } => {
                out.push(*ty);
                out.push(*name);
            }
            NodeKind::VarFragment { name, initializer } => {
                out.push(*name);
                out.extend(initializer);
            }
            NodeKind::TypeRef { .. }
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Empty
            | NodeKind::Literal { .. }
            | NodeKind::SimpleName { .. } => {}
            NodeKind::Block { statements } => out.extend(statements),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(*condition);
                out.push(*then_branch);
                out.extend(else_branch);
            }
            NodeKind::ExprStmt { expr }
            | NodeKind::Throw { expr }
            | NodeKind::Paren { expr } => out.push(*expr),
            NodeKind::Return { expr } => out.extend(expr),
            NodeKind::For {
                init,
                condition,
                updaters,
                body,
            } => {
                out.extend(init);
                out.extend(condition);
                out.extend(updaters);
                out.push(*body);
            }
            NodeKind::ForEach {
                param,
                iterable,
                body,
            } => {
                out.push(*param);
                out.push(*iterable);
                out.push(*body);
            }
            NodeKind::While { condition, body } => {
                out.push(*condition);
                out.push(*body);
            }
            NodeKind::Do { body, condition } => {
                out.push(*body);
                out.push(*condition);
            }
            NodeKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                out.extend(resources);
                out.push(*body);
                out.extend(catches);
                out.extend(finally);
            }
            NodeKind::Catch { param, body } => {
                out.push(*param);
                out.push(*body);
            }
            NodeKind::Labeled { body, .. } => out.push(*body),
            NodeKind::QualifiedName { qualifier, name } => {
                out.push(*qualifier);
                out.push(*name);
            }
            NodeKind::This { qualifier } => out.extend(qualifier),
            NodeKind::FieldAccess { target, name } => {
                out.push(*target);
                out.push(*name);
            }
            NodeKind::SuperFieldAccess { qualifier, name } => {
                out.extend(qualifier);
                out.push(*name);
            }
            NodeKind::MethodCall {
                receiver,
                name,
                args,
            } => {
                out.extend(receiver);
                out.push(*name);
                out.extend(args);
            }
            NodeKind::SuperMethodCall {
                qualifier,
                name,
                args,
            } => {
                out.extend(qualifier);
                out.push(*name);
                out.extend(args);
            }
            NodeKind::New { outer, ty, args } => {
                out.extend(outer);
                out.push(*ty);
                out.extend(args);
            }
            NodeKind::ArrayAccess { array, index } => {
                out.push(*array);
                out.push(*index);
            }
            NodeKind::ArrayCreation {
                ty,
                dimensions,
                initializer,
            } => {
                out.push(*ty);
                out.extend(dimensions);
                out.extend(initializer);
            }
            NodeKind::ArrayInit { elements } => out.extend(elements),
            NodeKind::Assign { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push(*condition);
                out.push(*then_expr);
                out.push(*else_expr);
            }
            NodeKind::Infix { operands, .. } => out.extend(operands),
            NodeKind::Prefix { operand, .. } | NodeKind::Postfix { operand, .. } => {
                out.push(*operand)
            }
            NodeKind::Cast { ty, expr } => {
                out.push(*ty);
                out.push(*expr);
            }
            NodeKind::InstanceOf { expr, ty } => {
                out.push(*expr);
                out.push(*ty);
            }
        }
        out
    }
}

/// Arena-owned syntax tree of one compilation unit.
///
/// Read-only once built. Parent links are indices, never owning pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    comments: Vec<Comment>,
    root: NodeId,
}

impl Ast {
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.idx()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.idx()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.idx()].range
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    pub fn is_statement(&self, id: NodeId) -> bool {
        self.kind(id).is_statement()
    }

    pub fn is_expression(&self, id: NodeId) -> bool {
        self.kind(id).is_expression()
    }

    /// The node's source text.
    pub fn text<'a>(&self, id: NodeId, source: &'a str) -> &'a str {
        self.range(id).slice(source)
    }

    /// All comments, sorted by start offset.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, id: CommentId) -> &Comment {
        &self.comments[id.idx()]
    }

    pub fn comment_ids(&self) -> impl Iterator<Item = CommentId> + '_ {
        (0..self.comments.len() as u32).map(CommentId)
    }

    /// Pre-order walk of the subtree rooted at `id`.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

/// Accumulates nodes bottom-up; [`AstBuilder::finish`] fills in parent links.
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
    comments: Vec<Comment>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            parent: None,
        });
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.idx()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.idx()].range
    }

    pub fn push_comment(&mut self, kind: CommentKind, range: TextRange) -> CommentId {
        let id = CommentId(self.comments.len() as u32);
        self.comments.push(Comment { kind, range });
        id
    }

    pub fn finish(mut self, root: NodeId) -> Ast {
        for idx in 0..self.nodes.len() {
            let parent = NodeId::from_raw(idx as u32);
            for child in self.nodes[idx].kind.children() {
                debug_assert!(
                    self.nodes[child.idx()].parent.is_none(),
                    "{child:?} has two parents"
                );
                self.nodes[child.idx()].parent = Some(parent);
            }
        }
        self.comments.sort_by_key(|c| (c.range.start(), c.range.end()));
        Ast {
            nodes: self.nodes,
            comments: self.comments,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(b: &mut AstBuilder, ident: &str, start: usize) -> NodeId {
        b.alloc(
            NodeKind::SimpleName {
                ident: ident.to_string(),
            },
            TextRange::from_len(start, ident.len()),
        )
    }

    #[test]
    fn finish_links_parents_and_orders_children() {
        // a = b;
        let mut b = AstBuilder::new();
        let lhs = name(&mut b, "a", 0);
        let rhs = name(&mut b, "b", 4);
        let assign = b.alloc(
            NodeKind::Assign {
                op: AssignOp::Assign,
                lhs,
                rhs,
            },
            TextRange::from_offsets(0, 5),
        );
        let stmt = b.alloc(NodeKind::ExprStmt { expr: assign }, TextRange::from_offsets(0, 6));
        let ast = b.finish(stmt);

        assert_eq!(ast.root(), stmt);
        assert_eq!(ast.parent(lhs), Some(assign));
        assert_eq!(ast.parent(assign), Some(stmt));
        assert_eq!(ast.parent(stmt), None);
        assert_eq!(ast.children(assign), vec![lhs, rhs]);
        assert_eq!(ast.preorder(stmt), vec![stmt, assign, lhs, rhs]);
        assert!(ast.is_ancestor_or_self(stmt, rhs));
        assert!(!ast.is_ancestor_or_self(lhs, rhs));
        assert!(ast.is_statement(stmt));
        assert!(ast.is_expression(assign));
    }

    #[test]
    fn comments_are_sorted_by_offset() {
        let mut b = AstBuilder::new();
        b.push_comment(CommentKind::Block, TextRange::from_offsets(10, 15));
        b.push_comment(CommentKind::Line, TextRange::from_offsets(0, 4));
        let root = b.alloc(NodeKind::Empty, TextRange::from_offsets(0, 1));
        let ast = b.finish(root);
        let starts: Vec<_> = ast.comments().iter().map(|c| c.range.start_offset()).collect();
        assert_eq!(starts, vec![0, 10]);
    }
}
