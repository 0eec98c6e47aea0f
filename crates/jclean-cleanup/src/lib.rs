//! Source-to-source Java clean-ups.
//!
//! The [`Engine`] parses a compilation unit through a host [`JavaFrontend`],
//! runs every enabled [`CleanupRule`] over the tree, and applies the resulting
//! batch of text edits. Passes repeat until one produces no edit or the pass
//! limit is hit.
//!
//! Rules never touch the text. They record intents in two per-visit ledgers:
//! [`Refactorings`] for code and [`CommentLedger`] for comments. The engine
//! synthesizes those into edits and drops any group that overlaps text
//! already claimed in the same pass; the next pass sees it again on a fresh
//! tree.
//!
//! [`JavaFrontend`]: jclean_ast::JavaFrontend

mod comments;
mod engine;
mod fingerprint;
mod rule;

pub mod common_suffix;
pub mod factory;
pub mod for_loop;
pub mod matcher;
pub mod refactorings;
pub mod rules;
pub mod side_effects;

pub use comments::CommentLedger;
pub use engine::{CancellationFlag, CleanupOutcome, Engine, EngineError, PassOutput};
pub use fingerprint::SourceFingerprint;
pub use matcher::{BooleanPolicy, MatchState, TreeMatcher};
pub use refactorings::{Refactorings, Replacement};
pub use rule::{CleanupRule, RuleContext, RuleError, Visit};
pub use side_effects::SideEffectPolicy;
