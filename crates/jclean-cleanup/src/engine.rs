//! Rule dispatch and the fixed-point driver.
//!
//! A pass runs every enabled rule over one immutable tree. Each rule walks the
//! tree top-down with an explicit stack; every visit gets fresh ledgers whose
//! synthesized edits join the pass batch all-or-nothing. A group that collides
//! with edits already queued is dropped and found again on the next pass.
//!
//! [`Engine::run`] repeats passes, re-parsing in between, until a pass yields
//! no edits, the pass limit is hit, or the host cancels.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jclean_ast::{Ast, FrontendError, JavaFrontend, NodeId, ParsedUnit, TypeOracle};
use jclean_config::CleanupConfig;
use jclean_core::{apply_text_edits, EditBatch, EditError, SourceText, TextEdit, TextRangeExt};
use serde::Serialize;
use thiserror::Error;

use crate::comments::CommentLedger;
use crate::fingerprint::SourceFingerprint;
use crate::rule::{CleanupRule, RuleContext, Visit};
use crate::rules;

/// Cooperative cancellation, checked between passes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse source: {0}")]
    Frontend(#[from] FrontendError),
    #[error("edits were computed for source {expected}, got {actual}")]
    StaleSource {
        expected: SourceFingerprint,
        actual: SourceFingerprint,
    },
    #[error("invalid edit batch: {0}")]
    Edit(#[from] EditError),
}

/// Edits found by one pass, tied to the text they were computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassOutput {
    pub fingerprint: SourceFingerprint,
    /// Sorted, non-overlapping.
    pub edits: Vec<TextEdit>,
    /// Rewrites accepted into the batch, per rule id.
    pub changes: BTreeMap<String, usize>,
}

impl PassOutput {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(&self, text: &str) -> Result<String, EngineError> {
        let actual = SourceFingerprint::of(text);
        if actual != self.fingerprint {
            return Err(EngineError::StaleSource {
                expected: self.fingerprint.clone(),
                actual,
            });
        }
        Ok(apply_text_edits(text, &self.edits)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub text: String,
    pub passes: usize,
    pub reached_fixed_point: bool,
    pub cancelled: bool,
    pub applied: BTreeMap<String, usize>,
}

pub struct Engine {
    config: CleanupConfig,
    rules: Vec<Box<dyn CleanupRule>>,
}

impl Engine {
    /// An engine running the built-in rules the configuration leaves enabled.
    pub fn new(config: CleanupConfig) -> Self {
        Self::with_rules(config, rules::builtin())
    }

    pub fn with_rules(config: CleanupConfig, rules: Vec<Box<dyn CleanupRule>>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| config.is_rule_enabled(rule.id()))
            .collect();
        Self { config, rules }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Runs every rule once over `unit`, whose text is `source`.
    pub fn run_pass(&self, unit: &ParsedUnit, source: &SourceText) -> Result<PassOutput, EngineError> {
        let ast = &unit.ast;
        let oracle = unit.oracle.as_ref();
        let mut batch = EditBatch::new();
        let mut comments = CommentLedger::new();
        let mut changes = BTreeMap::new();
        let mut comment_changes = BTreeMap::new();

        for rule in &self.rules {
            let mut walk = RuleWalk {
                rule: rule.as_ref(),
                ast,
                source,
                oracle,
                config: &self.config,
                batch: &mut batch,
                comments: &mut comments,
                applied: 0,
                comment_visits: 0,
            };
            walk.run();
            let (applied, comment_visits) = (walk.applied, walk.comment_visits);
            if applied > 0 {
                changes.insert(rule.id().to_string(), applied);
            }
            if comment_visits > 0 {
                comment_changes.insert(rule.id().to_string(), comment_visits);
            }
        }

        if comments.append_to(ast, source, &mut batch) {
            for (id, count) in comment_changes {
                *changes.entry(id).or_insert(0) += count;
            }
        }

        let edits = batch.into_edits(source.as_str())?;
        Ok(PassOutput {
            fingerprint: SourceFingerprint::of(source.as_str()),
            edits,
            changes,
        })
    }

    /// Cleans `text` up to a fixed point.
    ///
    /// Every rewritten text is parsed before it is accepted. If it no longer
    /// parses, the run stops with the last text that did, and the rejected pass
    /// counts neither in `passes` nor in `applied`.
    pub fn run(
        &self,
        frontend: &dyn JavaFrontend,
        text: &str,
        cancel: &CancellationFlag,
    ) -> Result<CleanupOutcome, EngineError> {
        let mut unit = frontend.parse(text)?;
        let mut outcome = CleanupOutcome {
            text: text.to_string(),
            passes: 0,
            reached_fixed_point: false,
            cancelled: false,
            applied: BTreeMap::new(),
        };

        while outcome.passes < self.config.max_passes {
            if cancel.is_cancelled() {
                tracing::info!(target: "jclean.engine", passes = outcome.passes, "cleanup cancelled");
                outcome.cancelled = true;
                return Ok(outcome);
            }

            let source = SourceText::new(outcome.text.as_str());
            let output = self.run_pass(&unit, &source)?;
            if output.is_empty() {
                outcome.passes += 1;
                outcome.reached_fixed_point = true;
                break;
            }
            tracing::debug!(
                target: "jclean.engine",
                pass = outcome.passes + 1,
                edits = output.edits.len(),
                changes = ?output.changes,
                "pass produced edits"
            );

            let rewritten = output.apply(&outcome.text)?;
            unit = match frontend.parse(&rewritten) {
                Ok(next) => next,
                Err(err) => {
                    tracing::error!(
                        target: "jclean.engine",
                        pass = outcome.passes + 1,
                        %err,
                        "rewritten source no longer parses; pass discarded"
                    );
                    return Ok(outcome);
                }
            };
            outcome.text = rewritten;
            outcome.passes += 1;
            for (id, count) in output.changes {
                *outcome.applied.entry(id).or_insert(0) += count;
            }
        }

        if !outcome.reached_fixed_point {
            tracing::warn!(
                target: "jclean.engine",
                max_passes = self.config.max_passes,
                "pass limit reached before a fixed point"
            );
        }
        tracing::info!(
            target: "jclean.engine",
            passes = outcome.passes,
            reached_fixed_point = outcome.reached_fixed_point,
            applied = ?outcome.applied,
            "cleanup finished"
        );
        Ok(outcome)
    }
}

/// One rule's traversal within a pass.
struct RuleWalk<'a, 'p> {
    rule: &'a dyn CleanupRule,
    ast: &'a Ast,
    source: &'a SourceText,
    oracle: &'a dyn TypeOracle,
    config: &'a CleanupConfig,
    batch: &'p mut EditBatch,
    comments: &'p mut CommentLedger,
    applied: usize,
    comment_visits: usize,
}

impl RuleWalk<'_, '_> {
    fn run(&mut self) {
        let mut stack = vec![self.ast.root()];
        while let Some(node) = stack.pop() {
            if self.batch.is_rewritten(self.ast.range(node)) {
                continue;
            }
            if self.visit(node) == Visit::Continue {
                let children = self.ast.children(node);
                stack.extend(children.into_iter().rev());
            }
        }
    }

    /// Visits `node`; any failure prunes its subtree for this rule.
    fn visit(&mut self, node: NodeId) -> Visit {
        let rule = self.rule;
        let mut ctx = RuleContext::new(self.ast, self.source, self.oracle, self.config);
        let result = panic::catch_unwind(AssertUnwindSafe(|| rule.visit(&mut ctx, node)));

        let visit = match result {
            Ok(Ok(visit)) => visit,
            Ok(Err(err)) => {
                if err.is_decline() {
                    tracing::debug!(target: "jclean.engine", rule = rule.id(), %err, "rule declined");
                } else {
                    tracing::warn!(target: "jclean.engine", rule = rule.id(), %err, "rule skipped subtree");
                }
                return Visit::SkipSubtree;
            }
            Err(payload) => {
                tracing::warn!(
                    target: "jclean.engine",
                    rule = rule.id(),
                    offset = self.ast.range(node).start_offset(),
                    panic = %panic_message(payload.as_ref()),
                    "rule panicked; subtree skipped"
                );
                return Visit::SkipSubtree;
            }
        };

        let (refactorings, comments) = ctx.into_ledgers();
        if !comments.is_empty() {
            self.comments.merge(comments);
            self.comment_visits += 1;
        }
        if refactorings.is_empty() {
            return visit;
        }

        let edits = match refactorings.synthesize(self.ast, self.source) {
            Ok(edits) => edits,
            Err(err) => {
                tracing::debug!(target: "jclean.engine", rule = rule.id(), %err, "intents do not synthesize");
                return Visit::SkipSubtree;
            }
        };
        match self.batch.try_extend(edits) {
            Ok(()) => {
                self.applied += 1;
                tracing::trace!(
                    target: "jclean.engine",
                    rule = rule.id(),
                    targets = ?refactorings.targets().collect::<Vec<_>>(),
                    "rewrite queued"
                );
            }
            Err(conflict) => {
                tracing::debug!(
                    target: "jclean.engine",
                    rule = rule.id(),
                    incoming = ?conflict.incoming,
                    queued = ?conflict.queued,
                    "rewrite conflicts with a queued edit; deferred to next pass"
                );
            }
        }
        visit
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
