//! Recognizes counted loops that walk an array or a list by index.

use jclean_ast::{
    AssignOp, Ast, InfixOp, LiteralKind, NodeId, NodeKind, PostfixOp, PrefixOp, TypeOracle,
    VariableId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Collection,
}

/// `for (int i = 0; i < c.length; i++)` or `for (int i = 0; i < c.size(); i++)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForLoopShape {
    pub kind: ContainerKind,
    pub index: VariableId,
    /// The array or collection expression the bound is taken from.
    pub container: NodeId,
    /// Uses of the index in the loop body.
    pub index_uses: Vec<NodeId>,
}

impl ForLoopShape {
    /// Whether `expr` reads the current element: `c[i]` or `c.get(i)`.
    pub fn is_element_access(&self, ast: &Ast, oracle: &dyn TypeOracle, expr: NodeId) -> bool {
        let (target, index) = match (self.kind, ast.kind(expr)) {
            (ContainerKind::Array, NodeKind::ArrayAccess { array, index }) => (*array, *index),
            (
                ContainerKind::Collection,
                NodeKind::MethodCall {
                    receiver: Some(receiver),
                    name,
                    args,
                },
            ) if ast.identifier(*name) == Some("get") && args.len() == 1 => (*receiver, args[0]),
            _ => return false,
        };
        self.is_index(oracle, index) && same_variable(ast, oracle, target, self.container)
    }

    fn is_index(&self, oracle: &dyn TypeOracle, expr: NodeId) -> bool {
        oracle.variable_of(expr).is_some_and(|b| b.id == self.index)
    }
}

pub fn classify(ast: &Ast, oracle: &dyn TypeOracle, for_stmt: NodeId) -> Option<ForLoopShape> {
    let NodeKind::For {
        init,
        condition: Some(condition),
        updaters,
        body,
    } = ast.kind(for_stmt)
    else {
        return None;
    };
    let index = zero_initialized_index(ast, oracle, init)?;

    let NodeKind::Infix { op, operands } = ast.kind(ast.unparenthesize(*condition)) else {
        return None;
    };
    if *op != InfixOp::Less || operands.len() != 2 {
        return None;
    }
    if oracle.variable_of(operands[0])?.id != index {
        return None;
    }
    let (kind, container) = bound(ast, oracle, operands[1])?;

    let [updater] = updaters.as_slice() else {
        return None;
    };
    if !increments(ast, oracle, *updater, index) {
        return None;
    }

    let index_uses = ast
        .preorder(*body)
        .into_iter()
        .filter(|node| {
            matches!(ast.kind(*node), NodeKind::SimpleName { .. })
                && oracle.variable_of(*node).is_some_and(|b| b.id == index)
        })
        .collect();
    Some(ForLoopShape {
        kind,
        index,
        container,
        index_uses,
    })
}

/// `int i = 0` as the only initializer.
fn zero_initialized_index(ast: &Ast, oracle: &dyn TypeOracle, init: &[NodeId]) -> Option<VariableId> {
    let [decl] = init else {
        return None;
    };
    let NodeKind::VarDeclExpr { fragments, .. } = ast.kind(*decl) else {
        return None;
    };
    let [fragment] = fragments.as_slice() else {
        return None;
    };
    let NodeKind::VarFragment {
        name,
        initializer: Some(initializer),
    } = ast.kind(*fragment)
    else {
        return None;
    };
    let zero = matches!(
        ast.kind(*initializer),
        NodeKind::Literal { kind: LiteralKind::Number, text } if text == "0"
    );
    if !zero {
        return None;
    }
    let binding = oracle.variable_of(*name)?;
    binding.ty.is_named("int").then_some(binding.id)
}

/// `c.length` on an array or `c.size()` on a collection.
fn bound(ast: &Ast, oracle: &dyn TypeOracle, expr: NodeId) -> Option<(ContainerKind, NodeId)> {
    match ast.kind(expr) {
        NodeKind::QualifiedName { qualifier, name } | NodeKind::FieldAccess { target: qualifier, name }
            if ast.identifier(*name) == Some("length") =>
        {
            oracle
                .type_of(*qualifier)?
                .is_array()
                .then_some((ContainerKind::Array, *qualifier))
        }
        NodeKind::MethodCall {
            receiver: Some(receiver),
            name,
            args,
        } if args.is_empty() && ast.identifier(*name) == Some("size") => {
            let ty = oracle.type_of(*receiver)?;
            oracle
                .is_subtype(&ty.qualified_name, "java.util.List")
                .then_some((ContainerKind::Collection, *receiver))
        }
        _ => None,
    }
}

/// `i++`, `++i` or `i += 1`.
fn increments(ast: &Ast, oracle: &dyn TypeOracle, expr: NodeId, index: VariableId) -> bool {
    let operand = match ast.kind(expr) {
        NodeKind::Postfix {
            op: PostfixOp::Increment,
            operand,
        }
        | NodeKind::Prefix {
            op: PrefixOp::Increment,
            operand,
        } => *operand,
        NodeKind::Assign {
            op: AssignOp::PlusAssign,
            lhs,
            rhs,
        } if matches!(
            ast.kind(*rhs),
            NodeKind::Literal { kind: LiteralKind::Number, text } if text == "1"
        ) =>
        {
            *lhs
        }
        _ => return false,
    };
    oracle.variable_of(operand).is_some_and(|b| b.id == index)
}

/// Both expressions name the same variable through the same receiver.
pub fn same_variable(ast: &Ast, oracle: &dyn TypeOracle, a: NodeId, b: NodeId) -> bool {
    let a = ast.unparenthesize(a);
    let b = ast.unparenthesize(b);
    match (oracle.variable_of(a), oracle.variable_of(b)) {
        (Some(x), Some(y)) if x.id == y.id => {
            let receiver = receiver_text(ast, a);
            receiver.is_some() && receiver == receiver_text(ast, b)
        }
        _ => false,
    }
}

/// `this` for bare names and `this.f`, the dotted qualifier otherwise.
fn receiver_text(ast: &Ast, expr: NodeId) -> Option<String> {
    match ast.kind(expr) {
        NodeKind::SimpleName { .. } => Some("this".to_string()),
        NodeKind::FieldAccess { target, .. }
            if matches!(ast.kind(*target), NodeKind::This { qualifier: None }) =>
        {
            Some("this".to_string())
        }
        NodeKind::FieldAccess {
            target: qualifier, ..
        }
        | NodeKind::QualifiedName { qualifier, .. } => ast.qualified_name(*qualifier),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jclean_ast::TextRangeExt;
    use jclean_test_utils::{find_node, parse_fixture};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"import java.util.*;
class A {
    List<String> out;
    void m(String[] arr, List<String> list, int n) {
        for (int i = 0; i < arr.length; i++) { out.add(arr[i]); }
        for (int j = 0; j < list.size(); ++j) { out.add(list.get(j)); }
        for (int k = 0; k < n; k++) { out.add("x"); }
        for (int p = 1; p < arr.length; p++) { out.add(arr[p]); }
    }
}
"#;

    fn first_for(ast: &jclean_ast::Ast, snippet: &str) -> NodeId {
        let start = SOURCE.find(snippet).expect("snippet");
        ast.preorder(ast.root())
            .into_iter()
            .find(|id| {
                matches!(ast.kind(*id), NodeKind::For { .. }) && ast.range(*id).start_offset() == start
            })
            .expect("for loop")
    }

    #[test]
    fn classifies_array_and_list_walks() {
        let unit = parse_fixture(SOURCE);
        let ast = &unit.ast;
        let oracle = unit.oracle.as_ref();

        let array = classify(ast, oracle, first_for(ast, "for (int i")).expect("array loop");
        assert_eq!(array.kind, ContainerKind::Array);
        assert_eq!(ast.text(array.container, SOURCE), "arr");
        assert_eq!(array.index_uses.len(), 1);
        assert!(array.is_element_access(ast, oracle, find_node(ast, SOURCE, "arr[i]")));

        let list = classify(ast, oracle, first_for(ast, "for (int j")).expect("list loop");
        assert_eq!(list.kind, ContainerKind::Collection);
        assert!(list.is_element_access(ast, oracle, find_node(ast, SOURCE, "list.get(j)")));
    }

    #[test]
    fn other_counted_loops_are_not_classified() {
        let unit = parse_fixture(SOURCE);
        let ast = &unit.ast;
        let oracle = unit.oracle.as_ref();
        assert_eq!(classify(ast, oracle, first_for(ast, "for (int k")), None);
        assert_eq!(classify(ast, oracle, first_for(ast, "for (int p")), None);
    }
}
