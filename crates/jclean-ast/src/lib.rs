//! Read-only Java syntax tree consumed by the cleanup engine.
//!
//! The tree is produced by an external parser ([`JavaFrontend`]) and owned by an
//! arena ([`Ast`]). Nodes are addressed by [`NodeId`]; the parent relation is a
//! plain index, so the tree has no ownership cycles. Type information comes from
//! a separate read-only [`TypeOracle`].

mod binding;
mod nav;
mod ops;
mod tree;
mod unit;

pub use binding::{
    ConstantValue, MethodBinding, TypeDescriptor, TypeOracle, UnresolvedOracle, VariableBinding,
    VariableId,
};
pub use ops::{AssignOp, InfixOp, LiteralKind, Modifiers, PostfixOp, PrefixOp, TypeDeclKind};
pub use tree::{Ast, AstBuilder, Comment, CommentId, CommentKind, Node, NodeId, NodeKind};
pub use unit::{FrontendError, JavaFrontend, ParsedUnit};

pub use jclean_core::{TextRange, TextRangeExt};
