//! Loops that add or remove one element per iteration become bulk calls:
//! `addAll`, `removeAll`, or `Collections.addAll` for arrays.

use jclean_ast::{NodeId, NodeKind, VariableId};

use super::replace_with;
use crate::factory;
use crate::for_loop::{self, ContainerKind};
use crate::rule::{CleanupRule, RuleContext, RuleError, Visit};
use crate::side_effects::is_passive;

const COLLECTION: &str = "java.util.Collection";
const SET: &str = "java.util.Set";
const COLLECTIONS: &str = "java.util.Collections";
/// `Collections.addAll` first shipped with Java 5.
const COLLECTIONS_ADD_ALL_RELEASE: u16 = 5;

pub struct AllInOneMethod;

impl CleanupRule for AllInOneMethod {
    fn id(&self) -> &'static str {
        "all_in_one_method"
    }

    fn name(&self) -> &'static str {
        "Use bulk collection methods"
    }

    fn description(&self) -> &'static str {
        "Replaces loops adding or removing each element with addAll or removeAll"
    }

    fn visit(&self, ctx: &mut RuleContext<'_>, node: NodeId) -> Result<Visit, RuleError> {
        let replacement = match ctx.ast.kind(node) {
            NodeKind::ForEach {
                param,
                iterable,
                body,
            } => for_each(ctx, *param, *iterable, *body)?,
            NodeKind::For { body, .. } => counted(ctx, node, *body)?,
            _ => None,
        };
        match replacement {
            Some(text) => {
                replace_with(ctx, node, vec![text]);
                Ok(Visit::SkipSubtree)
            }
            None => Ok(Visit::Continue),
        }
    }
}

/// `target.add(x)` or `target.remove(x)` as the loop's only statement.
struct ElementCall {
    call: NodeId,
    target: NodeId,
    element: NodeId,
    bulk: &'static str,
}

fn element_call(ctx: &RuleContext<'_>, body: NodeId) -> Result<Option<ElementCall>, RuleError> {
    let ast = ctx.ast;
    let statements = ast.statements_of(Some(body));
    let [stmt] = statements.as_slice() else {
        return Ok(None);
    };
    let NodeKind::ExprStmt { expr: call } = ast.kind(*stmt) else {
        return Ok(None);
    };
    let NodeKind::MethodCall {
        receiver: Some(target),
        name,
        args,
    } = ast.kind(*call)
    else {
        return Ok(None);
    };
    let [element] = args.as_slice() else {
        return Ok(None);
    };
    let name = match ast.identifier(*name) {
        Some(name @ ("add" | "remove")) => name,
        _ => return Ok(None),
    };
    if !is_passive(ast, *target) {
        return Ok(None);
    }

    ctx.oracle
        .method_of(*call)
        .ok_or_else(|| ctx.unresolved(*call, "collection method"))?;
    let ty = ctx.type_of(*target)?;
    if !ctx.oracle.is_subtype(&ty.qualified_name, COLLECTION) {
        return Ok(None);
    }
    // `List.remove(Object)` drops the first occurrence only.
    let bulk = match name {
        "add" => "addAll",
        _ if ctx.oracle.is_subtype(&ty.qualified_name, SET) => "removeAll",
        _ => return Ok(None),
    };
    Ok(Some(ElementCall {
        call: *call,
        target: *target,
        element: *element,
        bulk,
    }))
}

fn mentions(ctx: &RuleContext<'_>, expr: NodeId, variable: VariableId) -> bool {
    ctx.ast
        .preorder(expr)
        .into_iter()
        .any(|node| ctx.oracle.variable_of(node).is_some_and(|b| b.id == variable))
}

/// The bulk call over `source`, an array or a collection.
fn bulk_call(
    ctx: &RuleContext<'_>,
    call: &ElementCall,
    source: NodeId,
    kind: ContainerKind,
) -> Result<Option<String>, RuleError> {
    if for_loop::same_variable(ctx.ast, ctx.oracle, call.target, source) {
        return Err(ctx.malformed(call.call, "loop modifies the collection it iterates"));
    }
    let target = ctx.text(call.target);
    let source_text = ctx.text(source);
    let text = match kind {
        ContainerKind::Collection => format!("{target}.{}({source_text});", call.bulk),
        ContainerKind::Array => {
            let component = ctx
                .type_of(source)?
                .component_type()
                .ok_or_else(|| ctx.malformed(source, "array without component type"))?;
            if call.bulk != "addAll"
                || component.is_primitive()
                || !ctx.targets_release(COLLECTIONS_ADD_ALL_RELEASE)
            {
                return Ok(None);
            }
            let collections = factory::type_name_in_unit(ctx.ast, COLLECTIONS);
            format!("{collections}.addAll({target}, {source_text});")
        }
    };
    Ok(Some(text))
}

fn for_each(
    ctx: &RuleContext<'_>,
    param: NodeId,
    iterable: NodeId,
    body: NodeId,
) -> Result<Option<String>, RuleError> {
    let Some(call) = element_call(ctx, body)? else {
        return Ok(None);
    };
    let NodeKind::Param { name, .. } = ctx.ast.kind(param) else {
        return Ok(None);
    };
    let element = ctx
        .oracle
        .variable_of(*name)
        .ok_or_else(|| ctx.unresolved(param, "loop variable"))?;
    let is_element = matches!(ctx.ast.kind(call.element), NodeKind::SimpleName { .. })
        && ctx
            .oracle
            .variable_of(call.element)
            .is_some_and(|b| b.id == element.id);
    if !is_element || mentions(ctx, call.target, element.id) {
        return Ok(None);
    }

    let ty = ctx.type_of(iterable)?;
    let kind = if ty.is_array() {
        ContainerKind::Array
    } else if ctx.oracle.is_subtype(&ty.qualified_name, COLLECTION) {
        ContainerKind::Collection
    } else {
        return Ok(None);
    };
    bulk_call(ctx, &call, iterable, kind)
}

fn counted(ctx: &RuleContext<'_>, node: NodeId, body: NodeId) -> Result<Option<String>, RuleError> {
    let Some(shape) = for_loop::classify(ctx.ast, ctx.oracle, node) else {
        return Ok(None);
    };
    let Some(call) = element_call(ctx, body)? else {
        return Ok(None);
    };
    if shape.index_uses.len() != 1
        || !shape.is_element_access(ctx.ast, ctx.oracle, call.element)
        || mentions(ctx, call.target, shape.index)
    {
        return Ok(None);
    }
    bulk_call(ctx, &call, shape.container, shape.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run_rule_with;
    use jclean_config::CleanupConfig;
    use pretty_assertions::assert_eq;

    fn clean(imports: &str, body: &str) -> String {
        clean_for(CleanupConfig::default(), imports, body)
    }

    fn clean_for(config: CleanupConfig, imports: &str, body: &str) -> String {
        let source = format!(
            "{imports}class A {{\n    List<String> out;\n    Set<String> seen;\n    void m(List<String> list, String[] arr, int[] nums) {{\n{body}    }}\n}}\n"
        );
        let outcome = run_rule_with(config, AllInOneMethod, &source);
        let start = outcome.text.find("int[] nums) {\n").expect("method header") + 14;
        let end = outcome.text.len() - "    }\n}\n".len();
        outcome.text[start..end].to_string()
    }

    #[test]
    fn for_each_over_a_collection_uses_add_all() {
        assert_eq!(
            clean(
                "import java.util.*;\n",
                "        for (String s : list) {\n            out.add(s);\n        }\n"
            ),
            "        out.addAll(list);\n"
        );
    }

    #[test]
    fn arrays_go_through_collections_add_all() {
        assert_eq!(
            clean("import java.util.*;\n", "        for (String s : arr) out.add(s);\n"),
            "        Collections.addAll(out, arr);\n"
        );
        assert_eq!(
            clean(
                "import java.util.List;\nimport java.util.Set;\n",
                "        for (int i = 0; i < arr.length; i++) {\n            out.add(arr[i]);\n        }\n"
            ),
            "        java.util.Collections.addAll(out, arr);\n"
        );
    }

    #[test]
    fn arrays_stay_loops_before_collections_add_all_existed() {
        let config = CleanupConfig {
            java_release: 4,
            ..CleanupConfig::default()
        };
        let array_loop = "        for (int i = 0; i < arr.length; i++) {\n            out.add(arr[i]);\n        }\n";
        assert_eq!(clean_for(config.clone(), "import java.util.*;\n", array_loop), array_loop);
        assert_eq!(
            clean_for(
                config,
                "import java.util.*;\n",
                "        for (int i = 0; i < list.size(); i++) {\n            out.add(list.get(i));\n        }\n"
            ),
            "        out.addAll(list);\n"
        );
    }

    #[test]
    fn counted_loop_over_a_list_removing_from_a_set() {
        assert_eq!(
            clean(
                "import java.util.*;\n",
                "        for (int i = 0; i < list.size(); i++) {\n            seen.remove(list.get(i));\n        }\n"
            ),
            "        seen.removeAll(list);\n"
        );
    }

    #[test]
    fn loops_that_cannot_be_bulk_calls() {
        for body in [
            // first occurrence only
            "        for (String s : list) {\n            out.remove(s);\n        }\n",
            // iterates what it modifies
            "        for (String s : out) {\n            out.add(s);\n        }\n",
            // index used elsewhere
            "        for (int i = 0; i < arr.length; i++) {\n            out.add(arr[i] + i);\n        }\n",
        ] {
            assert_eq!(clean("import java.util.*;\n", body), body);
        }
    }
}
