use jclean_ast::{Ast, NodeId, TypeDescriptor, TypeOracle};
use jclean_config::CleanupConfig;
use jclean_core::{SourceText, TextRangeExt};
use thiserror::Error;

use crate::comments::CommentLedger;
use crate::factory::ExprText;
use crate::matcher::TreeMatcher;
use crate::refactorings::{Refactorings, Replacement};
use crate::side_effects::SideEffectPolicy;

/// Why a rule left a node alone.
///
/// None of these ever reaches the source text: every path ends in "no
/// transformation" for the node at hand.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("unresolved binding for {what} at offset {offset}")]
    UnresolvedBinding { offset: usize, what: &'static str },
    #[error("precondition failed at offset {offset}: {message}")]
    MalformedAssumption { offset: usize, message: String },
    #[error("unsupported construct at offset {offset}: {what}")]
    UnsupportedConstruct { offset: usize, what: String },
}

impl RuleError {
    /// Declines are routine; only unsupported constructs are worth a warning.
    pub fn is_decline(&self) -> bool {
        !matches!(self, RuleError::UnsupportedConstruct { .. })
    }
}

/// What the dispatcher does after a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend: the node was rewritten and its children are stale.
    SkipSubtree,
}

/// One self-contained transformation pattern.
pub trait CleanupRule: Send + Sync {
    /// Stable identifier used in configuration and statistics.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError>;
}

/// Everything a rule may read, plus the ledgers it writes to.
///
/// A context lives for exactly one visit and both ledgers start empty. The
/// dispatcher keeps them only if the visit returns normally.
pub struct RuleContext<'a> {
    pub ast: &'a Ast,
    pub source: &'a SourceText,
    pub oracle: &'a dyn TypeOracle,
    pub config: &'a CleanupConfig,
    pub comments: CommentLedger,
    refactorings: Refactorings,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        ast: &'a Ast,
        source: &'a SourceText,
        oracle: &'a dyn TypeOracle,
        config: &'a CleanupConfig,
    ) -> Self {
        Self {
            ast,
            source,
            oracle,
            config,
            comments: CommentLedger::new(),
            refactorings: Refactorings::new(),
        }
    }

    pub fn into_ledgers(self) -> (Refactorings, CommentLedger) {
        (self.refactorings, self.comments)
    }

    pub fn refactorings(&self) -> &Refactorings {
        &self.refactorings
    }

    pub fn text(&self, node: NodeId) -> &'a str {
        self.ast.text(node, self.source.as_str())
    }

    pub fn expr(&self, node: NodeId) -> ExprText {
        ExprText::of(self.ast, self.source, node)
    }

    pub fn matcher(&self) -> TreeMatcher<'a> {
        TreeMatcher::new(self.ast, self.oracle)
    }

    /// Whether the sources may call library methods introduced in `release`.
    pub fn targets_release(&self, release: u16) -> bool {
        self.config.java_release >= release
    }

    pub fn side_effect_policy(&self) -> SideEffectPolicy {
        SideEffectPolicy {
            trust_getters: self.config.trust_getters,
        }
    }

    pub fn type_of(&self, expr: NodeId) -> Result<TypeDescriptor, RuleError> {
        self.oracle
            .type_of(expr)
            .ok_or_else(|| self.unresolved(expr, "expression type"))
    }

    pub fn unresolved(&self, node: NodeId, what: &'static str) -> RuleError {
        RuleError::UnresolvedBinding {
            offset: self.ast.range(node).start_offset(),
            what,
        }
    }

    pub fn malformed(&self, node: NodeId, message: impl Into<String>) -> RuleError {
        RuleError::MalformedAssumption {
            offset: self.ast.range(node).start_offset(),
            message: message.into(),
        }
    }

    pub fn unsupported(&self, node: NodeId, what: impl Into<String>) -> RuleError {
        RuleError::UnsupportedConstruct {
            offset: self.ast.range(node).start_offset(),
            what: what.into(),
        }
    }

    pub fn remove(&mut self, node: NodeId) {
        self.refactorings.remove(node, self.ast.range(node));
    }

    pub fn replace(&mut self, node: NodeId, text: impl Into<String>) {
        self.refactorings
            .replace(node, self.ast.range(node), Replacement::Text(text.into()));
    }

    pub fn replace_with_statements(&mut self, node: NodeId, statements: Vec<String>) {
        self.refactorings
            .replace(node, self.ast.range(node), Replacement::Statements(statements));
    }

    pub fn insert_before(&mut self, anchor: NodeId, text: impl Into<String>) {
        self.refactorings
            .insert_before(anchor, self.ast.range(anchor), text.into());
    }

    pub fn insert_after(&mut self, anchor: NodeId, text: impl Into<String>) {
        self.refactorings
            .insert_after(anchor, self.ast.range(anchor), text.into());
    }

    pub fn move_node(&mut self, node: NodeId) {
        self.refactorings.move_node(node, self.ast.range(node));
    }
}
