//! Built-in clean-up rules.

mod all_in_one_method;
mod boolean;
mod collapse_if;
mod comments;
mod common_code_in_if_else;
mod dead_code;
mod field_default_values;
mod useless_null_check;

pub use all_in_one_method::AllInOneMethod;
pub use boolean::BooleanRule;
pub use collapse_if::CollapseIf;
pub use comments::CommentsRule;
pub use common_code_in_if_else::CommonCodeInIfElse;
pub use dead_code::DeadCode;
pub use field_default_values::FieldDefaultValues;
pub use useless_null_check::UselessNullCheck;

use jclean_ast::{Ast, NodeId, NodeKind, TextRangeExt};

use crate::factory;
use crate::refactorings::line_indent;
use crate::rule::{CleanupRule, RuleContext};

/// Every built-in rule, in dispatch order.
pub fn builtin() -> Vec<Box<dyn CleanupRule>> {
    vec![
        Box::new(CommentsRule),
        Box::new(FieldDefaultValues),
        Box::new(DeadCode),
        Box::new(UselessNullCheck),
        Box::new(BooleanRule),
        Box::new(CollapseIf),
        Box::new(CommonCodeInIfElse),
        Box::new(AllInOneMethod),
    ]
}

fn in_block(ast: &Ast, stmt: NodeId) -> bool {
    ast.parent(stmt)
        .is_some_and(|parent| matches!(ast.kind(parent), NodeKind::Block { .. }))
}

/// Replaces `stmt` with `statements`, each already indented for `stmt`'s line.
///
/// Inside a block they become siblings; in a single-statement slot they are
/// wrapped in a new block. An empty list removes `stmt`.
fn replace_with(ctx: &mut RuleContext<'_>, stmt: NodeId, mut statements: Vec<String>) {
    if statements.is_empty() {
        ctx.remove(stmt);
    } else if in_block(ctx.ast, stmt) {
        ctx.replace_with_statements(stmt, statements);
    } else if statements.len() == 1 && !starts_with_declaration(&statements[0]) {
        ctx.replace(stmt, statements.swap_remove(0));
    } else {
        let indent = line_indent(ctx.source, ctx.ast.range(stmt).start_offset());
        let inner = format!("{indent}{}", ctx.source.indent_unit());
        let statements: Vec<String> = statements
            .iter()
            .map(|s| factory::reindent(s, indent, &inner))
            .collect();
        ctx.replace(stmt, factory::block(ctx.source, indent, &statements));
    }
}

/// A declaration cannot stand alone in a statement slot.
fn starts_with_declaration(statement: &str) -> bool {
    let head = statement.split_whitespace().next().unwrap_or_default();
    matches!(
        head,
        "int" | "long" | "short" | "byte" | "char" | "boolean" | "float" | "double" | "final" | "var"
    ) || (head.starts_with(char::is_uppercase)
        && statement
            .split_whitespace()
            .nth(1)
            .is_some_and(|second| second.starts_with(|c: char| c.is_alphabetic() || c == '_')))
}

/// Statements of `branch` moved out to the indentation of `stmt`'s line.
fn lifted_statements(ctx: &RuleContext<'_>, stmt: NodeId, branch: NodeId) -> Vec<String> {
    let indent = line_indent(ctx.source, ctx.ast.range(stmt).start_offset());
    factory::unwrap_statements(ctx.ast, ctx.source, branch, indent)
}

#[cfg(test)]
pub(crate) mod test_support {
    use jclean_config::CleanupConfig;
    use jclean_test_utils::FixtureFrontend;

    use crate::engine::{CancellationFlag, CleanupOutcome, Engine};
    use crate::rule::CleanupRule;

    /// Runs one rule to its fixed point over `source`.
    pub(crate) fn run_rule(rule: impl CleanupRule + 'static, source: &str) -> CleanupOutcome {
        run_rule_with(CleanupConfig::default(), rule, source)
    }

    pub(crate) fn run_rule_with(
        config: CleanupConfig,
        rule: impl CleanupRule + 'static,
        source: &str,
    ) -> CleanupOutcome {
        let engine = Engine::with_rules(config, vec![Box::new(rule)]);
        engine
            .run(&FixtureFrontend, source, &CancellationFlag::new())
            .unwrap_or_else(|err| panic!("cleanup failed: {err}\n{source}"))
    }

    /// Wraps statements in a method of class `A` and cleans them with `rule`.
    pub(crate) fn clean_method(rule: impl CleanupRule + 'static, members: &str, body: &str) -> String {
        clean_method_with(CleanupConfig::default(), rule, members, body)
    }

    pub(crate) fn clean_method_with(
        config: CleanupConfig,
        rule: impl CleanupRule + 'static,
        members: &str,
        body: &str,
    ) -> String {
        let source = format!("class A {{\n{members}    void m() {{\n{body}    }}\n}}\n");
        let outcome = run_rule_with(config, rule, &source);
        let prefix = format!("class A {{\n{members}    void m() {{\n");
        outcome
            .text
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_suffix("    }\n}\n"))
            .unwrap_or_else(|| panic!("members were rewritten:\n{}", outcome.text))
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_rule_ids_are_unique() {
        let rules = builtin();
        let ids: HashSet<&str> = rules.iter().map(|rule| rule.id()).collect();
        assert_eq!(ids.len(), rules.len());
        assert!(rules.iter().all(|rule| !rule.description().is_empty()));
    }

    #[test]
    fn declarations_are_recognized() {
        assert!(starts_with_declaration("int i = 0;"));
        assert!(starts_with_declaration("List<String> xs = f();"));
        assert!(!starts_with_declaration("System.out.println(x);"));
        assert!(!starts_with_declaration("foo();"));
    }
}
