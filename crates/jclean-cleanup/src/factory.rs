//! Builds replacement source text: negated conditions, conjunctions, blocks,
//! re-indented statements.

use jclean_ast::{Ast, InfixOp, LiteralKind, NodeId, NodeKind, PrefixOp};
use jclean_core::{SourceText, TextRangeExt};

use crate::refactorings::line_indent;

pub const ASSIGNMENT: u8 = 1;
pub const CONDITIONAL: u8 = 2;
pub const UNARY: u8 = 13;
pub const POSTFIX: u8 = 14;
pub const PRIMARY: u8 = 15;

/// Expression source text with the binding strength of its outermost operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprText {
    pub text: String,
    pub precedence: u8,
}

impl ExprText {
    pub fn new(text: impl Into<String>, precedence: u8) -> Self {
        Self {
            text: text.into(),
            precedence,
        }
    }

    pub fn primary(text: impl Into<String>) -> Self {
        Self::new(text, PRIMARY)
    }

    pub fn of(ast: &Ast, source: &SourceText, expr: NodeId) -> Self {
        Self::new(ast.text(expr, source.as_str()), precedence(ast, expr))
    }

    /// The text, parenthesized when it binds looser than `min`.
    pub fn at_least(&self, min: u8) -> String {
        if self.precedence < min {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

pub fn precedence(ast: &Ast, expr: NodeId) -> u8 {
    match ast.kind(expr) {
        NodeKind::Assign { .. } => ASSIGNMENT,
        NodeKind::Conditional { .. } => CONDITIONAL,
        NodeKind::Infix { op, .. } => op.precedence(),
        NodeKind::InstanceOf { .. } => InfixOp::Less.precedence(),
        NodeKind::Prefix { .. } | NodeKind::Cast { .. } => UNARY,
        NodeKind::Postfix { .. } => POSTFIX,
        _ => PRIMARY,
    }
}

/// Minimum precedence an expression needs to stand in for `site` unparenthesized.
pub fn slot_precedence(ast: &Ast, site: NodeId) -> u8 {
    let Some(parent) = ast.parent(site) else {
        return 0;
    };
    match ast.kind(parent) {
        NodeKind::Prefix { .. } | NodeKind::Cast { .. } => UNARY,
        NodeKind::Postfix { .. } => POSTFIX,
        NodeKind::Infix { op, operands } => {
            if operands.first() == Some(&site) {
                op.precedence()
            } else {
                op.precedence() + 1
            }
        }
        NodeKind::InstanceOf { .. } => InfixOp::Less.precedence(),
        NodeKind::FieldAccess { target, .. } if *target == site => PRIMARY,
        NodeKind::MethodCall {
            receiver: Some(receiver),
            ..
        } if *receiver == site => PRIMARY,
        NodeKind::ArrayAccess { array, .. } if *array == site => PRIMARY,
        NodeKind::Conditional { condition, .. } if *condition == site => CONDITIONAL + 1,
        NodeKind::Conditional { .. } => CONDITIONAL,
        NodeKind::Assign { rhs, .. } if *rhs == site => ASSIGNMENT,
        _ => 0,
    }
}

/// The logical negation of a boolean expression.
///
/// Double negation and `==`/`!=` are folded; anything else gets a `!` prefix.
pub fn negate(ast: &Ast, source: &SourceText, expr: NodeId) -> ExprText {
    let inner = ast.unparenthesize(expr);
    match ast.kind(inner) {
        NodeKind::Prefix {
            op: PrefixOp::Not,
            operand,
        } => ExprText::of(ast, source, ast.unparenthesize(*operand)),
        NodeKind::Literal {
            kind: LiteralKind::Boolean(value),
            ..
        } => ExprText::primary(if *value { "false" } else { "true" }),
        NodeKind::Infix { op, operands } if operands.len() == 2 => {
            match op.negated_comparison() {
                Some(negated) => {
                    let lhs = ast.text(operands[0], source.as_str());
                    let rhs = ast.text(operands[1], source.as_str());
                    ExprText::new(format!("{lhs} {negated} {rhs}"), negated.precedence())
                }
                None => not(ExprText::of(ast, source, inner)),
            }
        }
        _ => not(ExprText::of(ast, source, inner)),
    }
}

pub fn not(expr: ExprText) -> ExprText {
    ExprText::new(format!("!{}", expr.at_least(UNARY)), UNARY)
}

pub fn and(lhs: ExprText, rhs: ExprText) -> ExprText {
    infix(InfixOp::ConditionalAnd, lhs, rhs)
}

pub fn or(lhs: ExprText, rhs: ExprText) -> ExprText {
    infix(InfixOp::ConditionalOr, lhs, rhs)
}

fn infix(op: InfixOp, lhs: ExprText, rhs: ExprText) -> ExprText {
    let prec = op.precedence();
    let rhs_min = if op.is_associative() { prec } else { prec + 1 };
    ExprText::new(
        format!("{} {op} {}", lhs.at_least(prec), rhs.at_least(rhs_min)),
        prec,
    )
}

/// `{ ... }` holding `statements`, each already indented for the inner level.
pub fn block(source: &SourceText, indent: &str, statements: &[String]) -> String {
    if statements.is_empty() {
        return "{}".to_string();
    }
    let sep = source.line_separator();
    let inner = format!("{indent}{}", source.indent_unit());
    let mut out = String::from("{");
    for statement in statements {
        out.push_str(sep);
        out.push_str(&inner);
        out.push_str(statement);
    }
    out.push_str(sep);
    out.push_str(indent);
    out.push('}');
    out
}

/// Shifts every line after the first from indentation `from` to `to`.
pub fn reindent(text: &str, from: &str, to: &str) -> String {
    if from == to {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split_inclusive('\n').enumerate() {
        match line.strip_prefix(from) {
            Some(rest) if i > 0 => {
                out.push_str(to);
                out.push_str(rest);
            }
            _ => out.push_str(line),
        }
    }
    out
}

/// Source text of `stmt` re-indented for a line starting with `indent`.
pub fn statement_text(ast: &Ast, source: &SourceText, stmt: NodeId, indent: &str) -> String {
    let from = line_indent(source, ast.range(stmt).start_offset());
    reindent(ast.text(stmt, source.as_str()), from, indent)
}

/// Statements of a branch one level shallower: the block's braces go, its
/// contents move out to `indent`.
pub fn unwrap_statements(
    ast: &Ast,
    source: &SourceText,
    branch: NodeId,
    indent: &str,
) -> Vec<String> {
    ast.statements_of(Some(branch))
        .into_iter()
        .map(|stmt| statement_text(ast, source, stmt, indent))
        .collect()
}

/// Whether `Boolean` must be spelled `java.lang.Boolean` in this unit.
pub fn boolean_type_name(ast: &Ast) -> &'static str {
    if imports_simple_name(ast, "Boolean") {
        "java.lang.Boolean"
    } else {
        "Boolean"
    }
}

/// Whether a single-type import brings `simple` into scope.
pub fn imports_simple_name(ast: &Ast, simple: &str) -> bool {
    imports(ast).any(|(name, on_demand)| {
        !on_demand && name.rsplit('.').next() == Some(simple)
    })
}

/// Shortest name under which `qualified` can be written in this unit.
pub fn type_name_in_unit(ast: &Ast, qualified: &str) -> String {
    let (package, simple) = qualified.rsplit_once('.').unwrap_or(("", qualified));
    let visible = imports(ast).any(|(name, on_demand)| {
        if on_demand {
            name == package
        } else {
            name == qualified
        }
    });
    if visible || package == "java.lang" {
        simple.to_string()
    } else {
        qualified.to_string()
    }
}

fn imports(ast: &Ast) -> impl Iterator<Item = (String, bool)> + '_ {
    let imports = match ast.kind(ast.root()) {
        NodeKind::CompilationUnit { imports, .. } => imports.as_slice(),
        _ => &[],
    };
    imports.iter().filter_map(|import| match ast.kind(*import) {
        NodeKind::ImportDecl {
            name,
            is_static: false,
            on_demand,
        } => Some((ast.qualified_name(*name)?, *on_demand)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_test_utils::{find_node, parse_fixture};
    use pretty_assertions::assert_eq;

    #[test]
    fn negation_folds_what_it_can() {
        let source = "class A { void m(boolean a, int x, int y) { f(!a, x == y, x < y, a && !a, true); } }";
        let unit = parse_fixture(source);
        let text = SourceText::new(source);
        let neg = |snippet: &str| negate(&unit.ast, &text, find_node(&unit.ast, source, snippet)).text;

        assert_eq!(neg("!a"), "a");
        assert_eq!(neg("x == y"), "x != y");
        assert_eq!(neg("x < y"), "!(x < y)");
        assert_eq!(neg("a && !a"), "!(a && !a)");
        assert_eq!(neg("true"), "false");
    }

    #[test]
    fn conjunction_parenthesizes_looser_operands() {
        let a = ExprText::new("a || b", InfixOp::ConditionalOr.precedence());
        let b = ExprText::new("c && d", InfixOp::ConditionalAnd.precedence());
        assert_eq!(and(a, b).text, "(a || b) && c && d");
        let c = ExprText::new("x = y", ASSIGNMENT);
        assert_eq!(or(ExprText::primary("p"), c).text, "p || (x = y)");
    }

    #[test]
    fn blocks_and_reindentation() {
        let text = SourceText::new("class A {\n  void m() {}\n}\n");
        assert_eq!(
            block(&text, "  ", &["a();".to_string(), "b();".to_string()]),
            "{\n    a();\n    b();\n  }"
        );
        assert_eq!(block(&text, "", &[]), "{}");
        assert_eq!(
            reindent("if (c) {\n        a();\n    }", "    ", ""),
            "if (c) {\n    a();\n}"
        );
    }

    #[test]
    fn import_sensitive_type_names() {
        let source = "import java.util.*;\nimport my.Boolean;\nclass A {}";
        let unit = parse_fixture(source);
        assert_eq!(boolean_type_name(&unit.ast), "java.lang.Boolean");
        assert_eq!(type_name_in_unit(&unit.ast, "java.util.Collections"), "Collections");
        assert_eq!(type_name_in_unit(&unit.ast, "java.io.File"), "java.io.File");
        assert_eq!(type_name_in_unit(&unit.ast, "java.lang.Boolean"), "Boolean");
    }
}
