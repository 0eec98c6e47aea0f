use jclean_ast::{Ast, LiteralKind, NodeId, NodeKind, TypeDeclKind, TypeDescriptor};

use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};

/// `int count = 0;` is `int count;` for a field.
///
/// Only non-final fields of classes: interface fields are implicitly final.
pub struct FieldDefaultValues;

impl CleanupRule for FieldDefaultValues {
    fn id(&self) -> &'static str {
        "field_default_values"
    }

    fn name(&self) -> &'static str {
        "Remove field default values"
    }

    fn description(&self) -> &'static str {
        "Removes field initializers that assign the default value of the field type"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let ast = ctx.ast;
        let NodeKind::FieldDecl {
            modifiers,
            fragments,
            ..
        } = ast.kind(node)
        else {
            return Ok(Visit::Continue);
        };
        let in_class = ast.parent(node).is_some_and(|parent| {
            matches!(
                ast.kind(parent),
                NodeKind::TypeDecl {
                    kind: TypeDeclKind::Class,
                    ..
                }
            )
        });
        if !in_class || modifiers.is_final() {
            return Ok(Visit::Continue);
        }

        let mut removed = false;
        for fragment in fragments {
            let NodeKind::VarFragment {
                name,
                initializer: Some(init),
            } = ast.kind(*fragment)
            else {
                continue;
            };
            let ty = ctx
                .oracle
                .variable_of(*name)
                .map(|binding| binding.ty)
                .ok_or_else(|| ctx.unresolved(*name, "field type"))?;
            if is_default_value(ast, &ty, *init) {
                ctx.remove(*init);
                removed = true;
            }
        }
        Ok(if removed {
            Visit::SkipSubtree
        } else {
            Visit::Continue
        })
    }
}

fn is_default_value(ast: &Ast, ty: &TypeDescriptor, init: NodeId) -> bool {
    let NodeKind::Literal { kind, text } = ast.kind(init) else {
        return false;
    };
    if !ty.is_primitive() {
        return *kind == LiteralKind::Null;
    }
    match kind {
        LiteralKind::Boolean(value) => ty.is_boolean() && !value,
        LiteralKind::Number => !ty.is_boolean() && is_zero(text),
        LiteralKind::Character => ty.is_named("char") && is_nul_char(text),
        LiteralKind::Null | LiteralKind::String => false,
    }
}

/// Whether a Java numeric literal denotes zero, in any radix or type.
fn is_zero(text: &str) -> bool {
    let text = text.to_ascii_lowercase().replace('_', "");
    let radix_digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0b"));
    if let Some(digits) = radix_digits {
        let digits = digits.strip_suffix('l').unwrap_or(digits);
        return !digits.is_empty() && digits.chars().all(|c| c == '0');
    }
    let text = text.trim_end_matches(['l', 'f', 'd']);
    let mantissa = text.split('e').next().unwrap_or_default();
    mantissa.contains('0') && mantissa.chars().all(|c| c == '0' || c == '.')
}

fn is_nul_char(text: &str) -> bool {
    let Some(inner) = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return false;
    };
    if let Some(hex) = inner.strip_prefix('\\').map(|e| e.trim_start_matches('u')) {
        if inner.starts_with("\\u") {
            return hex.len() == 4 && hex.chars().all(|c| c == '0');
        }
        return !hex.is_empty() && hex.len() <= 3 && hex.chars().all(|c| c == '0');
    }
    false
}
