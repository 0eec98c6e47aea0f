//! Name and type resolution for fixture compilation units.
//!
//! Resolution is scope based and deliberately shallow: locals, parameters and
//! fields of the unit's own types, the members in [`crate::library`], and the
//! usual Java typing of literals and operators. Anything else is left
//! unresolved, which is what rules must cope with anyway.

use std::collections::{HashMap, HashSet, VecDeque};

use jclean_ast::{
    Ast, ConstantValue, InfixOp, LiteralKind, MethodBinding, Modifiers, NodeId, NodeKind,
    PrefixOp, TextRangeExt, TypeDescriptor, TypeOracle, VariableBinding, VariableId,
};

use crate::library::{FIELDS, JAVA_LANG, METHODS, PACKAGES, SUPERTYPES};
use crate::parser::TypeHeader;

const OBJECT: &str = "java.lang.Object";

/// [`TypeOracle`] backed by tables computed once per fixture.
#[derive(Debug, Default)]
pub struct FixtureOracle {
    types: HashMap<NodeId, TypeDescriptor>,
    methods: HashMap<NodeId, MethodBinding>,
    variables: HashMap<NodeId, VariableBinding>,
    constants: HashMap<NodeId, ConstantValue>,
    supertypes: HashMap<String, Vec<String>>,
}

impl FixtureOracle {
    /// Every supertype of `name`, nearest first, ending with `java.lang.Object`.
    fn supertype_closure(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(direct) = self.supertypes.get(&next) {
                queue.extend(direct.iter().cloned());
            }
            if let Some((_, direct)) = SUPERTYPES.iter().find(|(ty, _)| *ty == next) {
                queue.extend(direct.iter().map(|s| s.to_string()));
            }
            order.push(next);
        }
        if !seen.contains(OBJECT) && !is_primitive(name) {
            order.push(OBJECT.to_string());
        }
        order
    }
}

impl TypeOracle for FixtureOracle {
    fn type_of(&self, expr: NodeId) -> Option<TypeDescriptor> {
        self.types.get(&expr).cloned()
    }

    fn method_of(&self, call: NodeId) -> Option<MethodBinding> {
        self.methods.get(&call).cloned()
    }

    fn variable_of(&self, name: NodeId) -> Option<VariableBinding> {
        self.variables.get(&name).cloned()
    }

    fn constant_value(&self, expr: NodeId) -> Option<ConstantValue> {
        self.constants.get(&expr).cloned()
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.supertype_closure(sub).iter().any(|s| s == sup)
    }
}

#[derive(Debug, Clone)]
struct DeclaredMethod {
    name: String,
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
    is_static: bool,
    is_constructor: bool,
    varargs: bool,
}

#[derive(Debug, Clone)]
struct DeclaredField {
    binding: VariableBinding,
}

#[derive(Debug, Clone, Default)]
struct DeclaredType {
    qualified: String,
    fields: Vec<DeclaredField>,
    methods: Vec<DeclaredMethod>,
}

pub(crate) fn resolve(ast: &Ast, source: &str, headers: &[TypeHeader]) -> FixtureOracle {
    let mut resolver = Resolver {
        ast,
        source,
        package: None,
        imports: HashMap::new(),
        on_demand: Vec::new(),
        declared: HashMap::new(),
        scopes: Vec::new(),
        var_constants: HashMap::new(),
        enclosing: Vec::new(),
        next_var: 0,
        out: FixtureOracle::default(),
    };
    resolver.read_unit_header();
    resolver.declare_types(headers);
    resolver.collect_members();

    let NodeKind::CompilationUnit { types, .. } = ast.kind(ast.root()) else {
        return resolver.out;
    };
    for ty in types {
        resolver.walk_type(*ty);
    }
    resolver.out
}

struct Resolver<'a> {
    ast: &'a Ast,
    source: &'a str,
    package: Option<String>,
    imports: HashMap<String, String>,
    on_demand: Vec<String>,
    /// Keyed by simple name.
    declared: HashMap<String, DeclaredType>,
    scopes: Vec<HashMap<String, VariableBinding>>,
    var_constants: HashMap<VariableId, ConstantValue>,
    /// Simple names of the enclosing type declarations, innermost last.
    enclosing: Vec<String>,
    next_var: u32,
    out: FixtureOracle,
}

impl<'a> Resolver<'a> {
    fn read_unit_header(&mut self) {
        let ast = self.ast;
        let NodeKind::CompilationUnit {
            package, imports, ..
        } = ast.kind(ast.root())
        else {
            return;
        };
        if let Some(package) = package {
            if let NodeKind::PackageDecl { name } = ast.kind(*package) {
                self.package = ast.qualified_name(*name);
            }
        }
        for import in imports {
            let NodeKind::ImportDecl {
                name,
                is_static: false,
                on_demand,
            } = ast.kind(*import)
            else {
                continue;
            };
            let Some(qualified) = ast.qualified_name(*name) else {
                continue;
            };
            if *on_demand {
                self.on_demand.push(qualified);
            } else if let Some(simple) = ast.identifier(*name) {
                self.imports.insert(simple.to_string(), qualified);
            }
        }
    }

    fn declare_types(&mut self, headers: &[TypeHeader]) {
        let ast = self.ast;
        for header in headers {
            let NodeKind::TypeDecl { name, .. } = ast.kind(header.decl) else {
                continue;
            };
            let Some(simple) = ast.identifier(*name) else {
                continue;
            };
            let qualified = match &self.package {
                Some(package) => format!("{package}.{simple}"),
                None => simple.to_string(),
            };
            self.declared.insert(
                simple.to_string(),
                DeclaredType {
                    qualified,
                    ..DeclaredType::default()
                },
            );
        }
        for header in headers {
            let Some(simple) = self.decl_name(header.decl) else {
                continue;
            };
            let supers = header
                .supertypes
                .iter()
                .map(|text| self.resolve_type_text(text).qualified_name)
                .collect();
            if let Some(qualified) = self.declared.get(&simple).map(|d| d.qualified.clone()) {
                self.out.supertypes.insert(qualified, supers);
            }
        }
    }

    fn collect_members(&mut self) {
        let ast = self.ast;
        let decls: Vec<NodeId> = ast
            .preorder(ast.root())
            .into_iter()
            .filter(|id| matches!(ast.kind(*id), NodeKind::TypeDecl { .. }))
            .collect();
        for decl in decls {
            let Some(simple) = self.decl_name(decl) else {
                continue;
            };
            let NodeKind::TypeDecl { members, .. } = ast.kind(decl) else {
                continue;
            };
            let mut fields = Vec::new();
            let mut methods = Vec::new();
            for member in members {
                match ast.kind(*member) {
                    NodeKind::FieldDecl {
                        modifiers,
                        ty,
                        fragments,
                    } => {
                        let ty = self.type_ref(*ty);
                        for fragment in fragments {
                            let NodeKind::VarFragment { name, initializer } = ast.kind(*fragment)
                            else {
                                continue;
                            };
                            let binding = self.new_binding(*name, ty.clone(), true, modifiers.is_final());
                            if modifiers.is_final() {
                                if let Some(value) = initializer.and_then(|i| literal_constant(ast, i)) {
                                    self.var_constants.insert(binding.id, value);
                                }
                            }
                            fields.push(DeclaredField { binding });
                        }
                    }
                    NodeKind::MethodDecl {
                        modifiers,
                        return_type,
                        name,
                        params,
                        ..
                    } => {
                        let ret = match return_type {
                            Some(ty) => self.type_ref(*ty),
                            None => TypeDescriptor::named(
                                self.declared
                                    .get(&simple)
                                    .map_or(simple.clone(), |d| d.qualified.clone()),
                            ),
                        };
                        let mut param_types = Vec::new();
                        let mut varargs = false;
                        for param in params {
                            if let NodeKind::Param { ty, .. } = ast.kind(*param) {
                                if let NodeKind::TypeRef { text } = ast.kind(*ty) {
                                    varargs = text.trim_end().ends_with("...");
                                }
                                param_types.push(self.type_ref(*ty));
                            }
                        }
                        methods.push(DeclaredMethod {
                            name: ast.identifier(*name).unwrap_or_default().to_string(),
                            params: param_types,
                            ret,
                            is_static: modifiers.is_static(),
                            is_constructor: return_type.is_none(),
                            varargs,
                        });
                    }
                    _ => {}
                }
            }
            if let Some(declared) = self.declared.get_mut(&simple) {
                declared.fields = fields;
                declared.methods = methods;
            }
        }
    }

    fn decl_name(&self, decl: NodeId) -> Option<String> {
        match self.ast.kind(decl) {
            NodeKind::TypeDecl { name, .. } => self.ast.identifier(*name).map(str::to_string),
            _ => None,
        }
    }

    fn new_binding(
        &mut self,
        name: NodeId,
        ty: TypeDescriptor,
        is_field: bool,
        is_final: bool,
    ) -> VariableBinding {
        let binding = VariableBinding {
            id: VariableId(self.next_var),
            name: self.ast.identifier(name).unwrap_or_default().to_string(),
            ty,
            is_field,
            is_final,
        };
        self.next_var += 1;
        self.out.variables.insert(name, binding.clone());
        binding
    }

    fn declare_local(&mut self, name: NodeId, ty: TypeDescriptor, is_final: bool) -> VariableBinding {
        let binding = self.new_binding(name, ty, false, is_final);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(binding.name.clone(), binding.clone());
        }
        binding
    }

    // --- walking ---

    fn walk_type(&mut self, decl: NodeId) {
        let ast = self.ast;
        let Some(simple) = self.decl_name(decl) else {
            return;
        };
        let NodeKind::TypeDecl { members, .. } = ast.kind(decl) else {
            return;
        };
        self.enclosing.push(simple);
        let saved_scopes = std::mem::take(&mut self.scopes);
        for member in members {
            match ast.kind(*member) {
                NodeKind::FieldDecl { ty, fragments, .. } => {
                    let declared = self.type_ref(*ty);
                    for fragment in fragments {
                        if let NodeKind::VarFragment {
                            initializer: Some(init),
                            ..
                        } = ast.kind(*fragment)
                        {
                            self.initializer(*init, &declared);
                        }
                    }
                }
                NodeKind::MethodDecl { params, body, .. } => {
                    self.scopes.push(HashMap::new());
                    for param in params {
                        if let NodeKind::Param {
                            modifiers,
                            ty,
                            name,
                        } = ast.kind(*param)
                        {
                            let ty = self.type_ref(*ty);
                            self.declare_local(*name, ty, modifiers.is_final());
                        }
                    }
                    if let Some(body) = body {
                        self.walk_stmt(*body);
                    }
                    self.scopes.pop();
                }
                NodeKind::TypeDecl { .. } => self.walk_type(*member),
                _ => {}
            }
        }
        self.scopes = saved_scopes;
        self.enclosing.pop();
    }

    fn walk_stmt(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Block { statements } => {
                self.scopes.push(HashMap::new());
                for stmt in statements {
                    self.walk_stmt(*stmt);
                }
                self.scopes.pop();
            }
            NodeKind::LocalVarDecl {
                modifiers,
                ty,
                fragments,
            }
            | NodeKind::VarDeclExpr {
                modifiers,
                ty,
                fragments,
            } => self.declare_fragments(*modifiers, *ty, fragments),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(*condition);
                self.walk_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.walk_stmt(*else_branch);
                }
            }
            NodeKind::ExprStmt { expr } | NodeKind::Throw { expr } => {
                self.expr(*expr);
            }
            NodeKind::Return { expr } => {
                if let Some(expr) = expr {
                    self.expr(*expr);
                }
            }
            NodeKind::For {
                init,
                condition,
                updaters,
                body,
            } => {
                self.scopes.push(HashMap::new());
                for i in init {
                    self.walk_stmt(*i);
                }
                if let Some(condition) = condition {
                    self.expr(*condition);
                }
                for u in updaters {
                    self.expr(*u);
                }
                self.walk_stmt(*body);
                self.scopes.pop();
            }
            NodeKind::ForEach {
                param,
                iterable,
                body,
            } => {
                self.scopes.push(HashMap::new());
                let iterable_ty = self.expr(*iterable);
                if let NodeKind::Param {
                    modifiers,
                    ty,
                    name,
                } = ast.kind(*param)
                {
                    let ty = if is_var(ast, *ty) {
                        iterable_ty
                            .as_ref()
                            .and_then(element_type)
                            .unwrap_or_else(|| TypeDescriptor::named(OBJECT))
                    } else {
                        self.type_ref(*ty)
                    };
                    self.declare_local(*name, ty, modifiers.is_final());
                }
                self.walk_stmt(*body);
                self.scopes.pop();
            }
            NodeKind::While { condition, body } | NodeKind::Do { body, condition } => {
                self.expr(*condition);
                self.walk_stmt(*body);
            }
            NodeKind::Try {
                resources,
                body,
                catches,
                finally,
            } => {
                self.scopes.push(HashMap::new());
                for resource in resources {
                    self.walk_stmt(*resource);
                }
                self.walk_stmt(*body);
                self.scopes.pop();
                for catch in catches {
                    self.walk_stmt(*catch);
                }
                if let Some(finally) = finally {
                    self.walk_stmt(*finally);
                }
            }
            NodeKind::Catch { param, body } => {
                self.scopes.push(HashMap::new());
                if let NodeKind::Param { ty, name, .. } = ast.kind(*param) {
                    let ty = self.type_ref(*ty);
                    self.declare_local(*name, ty, false);
                }
                self.walk_stmt(*body);
                self.scopes.pop();
            }
            NodeKind::Labeled { body, .. } => self.walk_stmt(*body),
            kind if kind.is_expression() => {
                self.expr(id);
            }
            _ => {}
        }
    }

    fn declare_fragments(&mut self, modifiers: Modifiers, ty: NodeId, fragments: &[NodeId]) {
        let ast = self.ast;
        let declared = (!is_var(ast, ty)).then(|| self.type_ref(ty));
        for fragment in fragments {
            let NodeKind::VarFragment { name, initializer } = ast.kind(*fragment) else {
                continue;
            };
            let expected = declared.clone().unwrap_or_else(|| TypeDescriptor::named(OBJECT));
            let init_ty = initializer.and_then(|init| self.initializer(init, &expected));
            let ty = match &declared {
                Some(ty) => ty.clone(),
                None => init_ty.unwrap_or(expected),
            };
            let binding = self.declare_local(*name, ty, modifiers.is_final());
            if modifiers.is_final() {
                if let Some(value) = initializer.and_then(|init| self.out.constants.get(&init).cloned()) {
                    self.var_constants.insert(binding.id, value);
                }
            }
        }
    }

    fn initializer(&mut self, init: NodeId, expected: &TypeDescriptor) -> Option<TypeDescriptor> {
        if let NodeKind::ArrayInit { elements } = self.ast.kind(init) {
            for element in elements {
                let component = expected.component_type();
                match component {
                    Some(component) => {
                        self.initializer(*element, &component);
                    }
                    None => {
                        self.expr(*element);
                    }
                }
            }
            self.out.types.insert(init, expected.clone());
            return Some(expected.clone());
        }
        self.expr(init)
    }

    // --- expressions ---

    fn expr(&mut self, id: NodeId) -> Option<TypeDescriptor> {
        let ast = self.ast;
        let ty = match ast.kind(id) {
            NodeKind::Literal { kind, text } => self.literal(id, kind, text),
            NodeKind::SimpleName { ident } => {
                let binding = self.lookup(ident)?;
                Some(self.bind_variable(id, binding))
            }
            NodeKind::QualifiedName { qualifier, name } => self.member_access(id, *qualifier, *name),
            NodeKind::FieldAccess { target, name } => self.member_access(id, *target, *name),
            NodeKind::This { .. } => self.current_type().map(TypeDescriptor::named),
            NodeKind::SuperFieldAccess { .. } => None,
            NodeKind::MethodCall {
                receiver,
                name,
                args,
            } => self.method_call(id, *receiver, *name, args),
            NodeKind::SuperMethodCall { args, .. } => {
                for arg in args {
                    self.expr(*arg);
                }
                None
            }
            NodeKind::New { ty, args, .. } => self.instance_creation(id, *ty, args),
            NodeKind::ArrayAccess { array, index } => {
                self.expr(*index);
                self.expr(*array).and_then(|ty| ty.component_type())
            }
            NodeKind::ArrayCreation {
                ty,
                dimensions,
                initializer,
            } => {
                for dim in dimensions {
                    self.expr(*dim);
                }
                let element = self.type_ref(*ty);
                let end = initializer.map_or(ast.range(id).end_offset(), |init| ast.range(init).start_offset());
                let brackets = ast.range(*ty).end_offset()..end;
                let depth = self.source_brackets(brackets);
                let mut array = element;
                for _ in 0..depth.max(1) {
                    array = TypeDescriptor::array_of(array);
                }
                if let Some(init) = initializer {
                    self.initializer(*init, &array);
                }
                Some(array)
            }
            NodeKind::ArrayInit { elements } => {
                for element in elements {
                    self.expr(*element);
                }
                None
            }
            NodeKind::Assign { lhs, rhs, .. } => {
                let ty = self.expr(*lhs);
                self.expr(*rhs);
                ty
            }
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(*condition);
                let then_ty = self.expr(*then_expr);
                let else_ty = self.expr(*else_expr);
                match then_ty {
                    Some(ty) if !ty.is_named("null") => Some(ty),
                    _ => else_ty,
                }
            }
            NodeKind::Infix { op, operands } => self.infix(id, *op, operands),
            NodeKind::Prefix { op, operand } => {
                let ty = self.expr(*operand);
                let constant = self.out.constants.get(operand).cloned();
                match (op, constant) {
                    (PrefixOp::Not, Some(ConstantValue::Boolean(value))) => {
                        self.out.constants.insert(id, ConstantValue::Boolean(!value));
                    }
                    (PrefixOp::Minus, Some(ConstantValue::Int(value))) => {
                        self.out.constants.insert(id, ConstantValue::Int(-value));
                    }
                    (PrefixOp::Minus, Some(ConstantValue::Long(value))) => {
                        self.out.constants.insert(id, ConstantValue::Long(-value));
                    }
                    _ => {}
                }
                match op {
                    PrefixOp::Not => Some(TypeDescriptor::named("boolean")),
                    _ => ty,
                }
            }
            NodeKind::Postfix { operand, .. } => self.expr(*operand),
            NodeKind::Cast { ty, expr } => {
                self.expr(*expr);
                Some(self.type_ref(*ty))
            }
            NodeKind::InstanceOf { expr, .. } => {
                self.expr(*expr);
                Some(TypeDescriptor::named("boolean"))
            }
            NodeKind::Paren { expr } => {
                let ty = self.expr(*expr);
                if let Some(value) = self.out.constants.get(expr).cloned() {
                    self.out.constants.insert(id, value);
                }
                ty
            }
            NodeKind::VarDeclExpr { .. } => {
                self.walk_stmt(id);
                None
            }
            _ => None,
        };
        if let Some(ty) = &ty {
            self.out.types.insert(id, ty.clone());
        }
        ty
    }

    fn literal(&mut self, id: NodeId, kind: &LiteralKind, text: &str) -> Option<TypeDescriptor> {
        let (ty, value) = match kind {
            LiteralKind::Boolean(value) => ("boolean", Some(ConstantValue::Boolean(*value))),
            LiteralKind::Null => ("null", None),
            LiteralKind::Character => ("char", unescape(&text[1..text.len() - 1]).and_then(|s| {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(ConstantValue::Char(c)),
                    _ => None,
                }
            })),
            LiteralKind::String => (
                "java.lang.String",
                unescape(&text[1..text.len() - 1]).map(ConstantValue::String),
            ),
            LiteralKind::Number => number_literal(text),
        };
        if let Some(value) = value {
            self.out.constants.insert(id, value);
        }
        Some(TypeDescriptor::named(ty))
    }

    fn bind_variable(&mut self, id: NodeId, binding: VariableBinding) -> TypeDescriptor {
        if let Some(value) = self.var_constants.get(&binding.id) {
            self.out.constants.insert(id, value.clone());
        }
        let ty = binding.ty.clone();
        self.out.variables.insert(id, binding);
        ty
    }

    fn lookup(&self, ident: &str) -> Option<VariableBinding> {
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.get(ident) {
                return Some(binding.clone());
            }
        }
        for simple in self.enclosing.iter().rev() {
            let Some(declared) = self.declared.get(simple) else {
                continue;
            };
            if let Some(field) = declared.fields.iter().find(|f| f.binding.name == ident) {
                return Some(field.binding.clone());
            }
        }
        None
    }

    fn current_type(&self) -> Option<String> {
        let simple = self.enclosing.last()?;
        self.declared.get(simple).map(|d| d.qualified.clone())
    }

    /// `target` names a type rather than a value: `Boolean` in `Boolean.TRUE`.
    fn type_name_of(&self, target: NodeId) -> Option<String> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::SimpleName { ident } if self.lookup(ident).is_none() => {
                let qualified = self.qualify(ident);
                self.is_known_type(&qualified).then_some(qualified)
            }
            NodeKind::QualifiedName { .. } => {
                let text = ast.qualified_name(target)?;
                let first = text.split('.').next()?;
                if self.lookup(first).is_some() {
                    return None;
                }
                self.is_known_type(&text).then_some(text)
            }
            _ => None,
        }
    }

    fn is_known_type(&self, qualified: &str) -> bool {
        self.declared.values().any(|d| d.qualified == qualified)
            || SUPERTYPES.iter().any(|(ty, _)| *ty == qualified)
            || METHODS.iter().any(|m| m.owner == qualified)
            || FIELDS.iter().any(|(owner, _, _)| *owner == qualified)
            || qualified
                .strip_prefix("java.lang.")
                .is_some_and(|simple| JAVA_LANG.contains(&simple))
    }

    fn member_access(&mut self, id: NodeId, target: NodeId, name: NodeId) -> Option<TypeDescriptor> {
        let ast = self.ast;
        let ident = ast.identifier(name)?.to_string();
        if let Some(owner) = self.type_name_of(target) {
            return self.field_of(id, name, &owner, &ident);
        }
        let target_ty = self.expr(target)?;
        if target_ty.is_array() {
            return (ident == "length").then(|| TypeDescriptor::named("int"));
        }
        self.field_of(id, name, &target_ty.qualified_name, &ident)
    }

    fn field_of(&mut self, id: NodeId, name: NodeId, owner: &str, ident: &str) -> Option<TypeDescriptor> {
        let field = self
            .declared
            .values()
            .find(|d| d.qualified == owner)
            .and_then(|d| d.fields.iter().find(|f| f.binding.name == ident))
            .map(|f| f.binding.clone());
        if let Some(binding) = field {
            self.out.variables.insert(name, binding.clone());
            return Some(self.bind_variable(id, binding));
        }
        FIELDS
            .iter()
            .find(|(field_owner, field, _)| *field_owner == owner && *field == ident)
            .map(|(_, _, ty)| TypeDescriptor::named(*ty))
    }

    fn method_call(
        &mut self,
        id: NodeId,
        receiver: Option<NodeId>,
        name: NodeId,
        args: &[NodeId],
    ) -> Option<TypeDescriptor> {
        let ast = self.ast;
        let (owners, receiver_ty) = match receiver {
            None => {
                let owners: Vec<String> = self
                    .enclosing
                    .iter()
                    .rev()
                    .filter_map(|simple| self.declared.get(simple).map(|d| d.qualified.clone()))
                    .collect();
                (owners, None)
            }
            Some(receiver) => match self.type_name_of(receiver) {
                Some(owner) => (vec![owner], None),
                None => match self.expr(receiver) {
                    Some(ty) if !ty.is_array() && !ty.is_primitive() => {
                        (vec![ty.qualified_name.clone()], Some(ty))
                    }
                    _ => (Vec::new(), None),
                },
            },
        };
        let arg_types: Vec<Option<TypeDescriptor>> = args.iter().map(|arg| self.expr(*arg)).collect();
        let ident = ast.identifier(name)?;
        for owner in owners {
            if let Some((binding, ret)) = self.find_method(&owner, ident, &arg_types, receiver_ty.as_ref()) {
                self.out.methods.insert(id, binding);
                return Some(ret);
            }
        }
        None
    }

    fn find_method(
        &self,
        owner: &str,
        name: &str,
        args: &[Option<TypeDescriptor>],
        receiver: Option<&TypeDescriptor>,
    ) -> Option<(MethodBinding, TypeDescriptor)> {
        for ty in self.out.supertype_closure(owner) {
            let mut best: Option<(u32, MethodBinding, TypeDescriptor)> = None;
            let mut consider = |score: Option<u32>, binding: MethodBinding, ret: TypeDescriptor| {
                if let Some(score) = score {
                    if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
                        best = Some((score, binding, ret));
                    }
                }
            };

            if let Some(declared) = self.declared.values().find(|d| d.qualified == ty) {
                for method in declared.methods.iter().filter(|m| m.name == name && !m.is_constructor) {
                    let params: Vec<String> = method.params.iter().map(TypeDescriptor::erasure).collect();
                    let score = self.score_args(&params, method.varargs, args);
                    consider(
                        score,
                        MethodBinding {
                            declaring_type: ty.clone(),
                            name: method.name.clone(),
                            parameter_types: params,
                            return_type: method.ret.clone(),
                            is_static: method.is_static,
                            is_constructor: false,
                            is_varargs: method.varargs,
                        },
                        method.ret.clone(),
                    );
                }
            }
            for method in METHODS.iter().filter(|m| m.owner == ty && m.name == name) {
                let params: Vec<String> = method.params.iter().map(|p| p.to_string()).collect();
                let score = self.score_args(&params, method.varargs, args);
                let ret = library_return_type(method.ret, receiver);
                consider(
                    score,
                    MethodBinding {
                        declaring_type: ty.clone(),
                        name: method.name.to_string(),
                        parameter_types: params,
                        return_type: ret.clone(),
                        is_static: method.is_static,
                        is_constructor: false,
                        is_varargs: method.varargs,
                    },
                    ret,
                );
            }
            if let Some((_, binding, ret)) = best {
                return Some((binding, ret));
            }
        }
        None
    }

    fn score_args(&self, params: &[String], varargs: bool, args: &[Option<TypeDescriptor>]) -> Option<u32> {
        let fixed = if varargs { params.len() - 1 } else { params.len() };
        if args.len() < fixed || (!varargs && args.len() != params.len()) {
            return None;
        }
        let mut total = 0;
        for (param, arg) in params[..fixed].iter().zip(args) {
            total += self.score_arg(param, arg.as_ref())?;
        }
        if varargs {
            let rest = &args[fixed..];
            let array_param = &params[fixed];
            let passes_array = rest.len() == 1
                && rest[0].as_ref().is_some_and(TypeDescriptor::is_array);
            if passes_array {
                total += 2;
            } else {
                let component = array_param.trim_end_matches("[]");
                for arg in rest {
                    total += self.score_arg(component, arg.as_ref())?;
                }
            }
        }
        Some(total)
    }

    fn score_arg(&self, param: &str, arg: Option<&TypeDescriptor>) -> Option<u32> {
        let Some(arg) = arg else {
            return Some(1);
        };
        let erasure = arg.erasure();
        if erasure == param {
            return Some(3);
        }
        if is_primitive(param) {
            if arg.is_primitive() {
                return widens(&arg.qualified_name, param).then_some(2);
            }
            return (boxed(param) == Some(arg.qualified_name.as_str())).then_some(1);
        }
        if arg.is_named("null") {
            return Some(2);
        }
        if arg.is_primitive() {
            let boxed = boxed(&arg.qualified_name)?;
            return (param == OBJECT || self.out.is_subtype(boxed, param)).then_some(1);
        }
        if arg.is_array() {
            return (param == OBJECT || param.ends_with("[]")).then_some(1);
        }
        if self.out.is_subtype(&arg.qualified_name, param) {
            return Some(2);
        }
        // Types outside the tables have unknown supertypes.
        (!self.is_known_type(&arg.qualified_name)).then_some(1)
    }

    fn instance_creation(&mut self, id: NodeId, ty: NodeId, args: &[NodeId]) -> Option<TypeDescriptor> {
        let arg_types: Vec<Option<TypeDescriptor>> = args.iter().map(|arg| self.expr(*arg)).collect();
        let created = self.type_ref(ty);
        let declared = self
            .declared
            .values()
            .find(|d| d.qualified == created.qualified_name)
            .cloned();
        let binding = match declared {
            Some(declared) => declared
                .methods
                .iter()
                .filter(|m| m.is_constructor)
                .filter_map(|m| {
                    let params: Vec<String> = m.params.iter().map(TypeDescriptor::erasure).collect();
                    let score = self.score_args(&params, m.varargs, &arg_types)?;
                    Some((score, m, params))
                })
                .max_by_key(|(score, _, _)| *score)
                .map(|(_, m, params)| MethodBinding {
                    declaring_type: created.qualified_name.clone(),
                    name: m.name.clone(),
                    parameter_types: params,
                    return_type: created.clone(),
                    is_static: false,
                    is_constructor: true,
                    is_varargs: m.varargs,
                })
                .or_else(|| {
                    args.is_empty().then(|| default_constructor(&created))
                }),
            None => Some(MethodBinding {
                parameter_types: arg_types
                    .iter()
                    .map(|ty| ty.as_ref().map_or_else(|| OBJECT.to_string(), TypeDescriptor::erasure))
                    .collect(),
                ..default_constructor(&created)
            }),
        };
        if let Some(binding) = binding {
            self.out.methods.insert(id, binding);
        }
        Some(created)
    }

    fn infix(&mut self, id: NodeId, op: InfixOp, operands: &[NodeId]) -> Option<TypeDescriptor> {
        let types: Vec<Option<TypeDescriptor>> = operands.iter().map(|o| self.expr(*o)).collect();
        let constants: Option<Vec<bool>> = operands
            .iter()
            .map(|o| self.out.constants.get(o).and_then(ConstantValue::as_bool))
            .collect();
        let boolean = TypeDescriptor::named("boolean");
        match op {
            InfixOp::ConditionalAnd | InfixOp::ConditionalOr => {
                if let Some(values) = constants {
                    let value = if op == InfixOp::ConditionalAnd {
                        values.iter().all(|v| *v)
                    } else {
                        values.iter().any(|v| *v)
                    };
                    self.out.constants.insert(id, ConstantValue::Boolean(value));
                }
                Some(boolean)
            }
            InfixOp::Less
            | InfixOp::Greater
            | InfixOp::LessEquals
            | InfixOp::GreaterEquals
            | InfixOp::Equals
            | InfixOp::NotEquals => Some(boolean),
            InfixOp::Plus
                if types
                    .iter()
                    .any(|t| t.as_ref().is_some_and(|t| t.is_named("java.lang.String"))) =>
            {
                Some(TypeDescriptor::named("java.lang.String"))
            }
            InfixOp::BitAnd | InfixOp::BitOr | InfixOp::Xor
                if types.iter().all(|t| t.as_ref().is_some_and(TypeDescriptor::is_boolean_like)) =>
            {
                Some(boolean)
            }
            _ => {
                let mut names = Vec::new();
                for ty in &types {
                    names.push(unboxed(&ty.as_ref()?.qualified_name)?);
                }
                let promoted = ["double", "float", "long"]
                    .into_iter()
                    .find(|wide| names.contains(wide))
                    .unwrap_or("int");
                Some(TypeDescriptor::named(promoted))
            }
        }
    }

    /// Dimensions of `new T[n][]`: bracket pairs between the element type and
    /// the initializer, nested index expressions excluded.
    fn source_brackets(&self, range: std::ops::Range<usize>) -> usize {
        let Some(text) = self.source.get(range) else {
            return 0;
        };
        let mut depth = 0usize;
        let mut dims = 0;
        for c in text.chars() {
            match c {
                '[' => {
                    if depth == 0 {
                        dims += 1;
                    }
                    depth += 1;
                }
                ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        dims
    }

    // --- types ---

    fn type_ref(&self, ty: NodeId) -> TypeDescriptor {
        match self.ast.kind(ty) {
            NodeKind::TypeRef { text } => self.resolve_type_text(text),
            _ => TypeDescriptor::named(OBJECT),
        }
    }

    fn resolve_type_text(&self, text: &str) -> TypeDescriptor {
        let mut text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut dims = 0u8;
        if let Some(stripped) = text.strip_suffix("...") {
            text = stripped.to_string();
            dims += 1;
        }
        while let Some(stripped) = text.strip_suffix("[]") {
            text = stripped.to_string();
            dims += 1;
        }
        let (base, args) = match text.find('<') {
            Some(lt) if text.ends_with('>') => (&text[..lt], split_type_args(&text[lt + 1..text.len() - 1])),
            _ => (text.as_str(), Vec::new()),
        };
        let type_arguments = args
            .iter()
            .map(|arg| {
                let bound = arg
                    .strip_prefix("?extends")
                    .or_else(|| arg.strip_prefix("?super"))
                    .unwrap_or(arg);
                if bound.is_empty() || bound == "?" {
                    TypeDescriptor::named(OBJECT)
                } else {
                    self.resolve_type_text(bound)
                }
            })
            .collect();
        TypeDescriptor {
            qualified_name: self.qualify(base),
            type_arguments,
            array_dimensions: dims,
        }
    }

    fn qualify(&self, name: &str) -> String {
        if is_primitive(name) || name == "void" {
            return name.to_string();
        }
        if let Some((first, rest)) = name.split_once('.') {
            if first.starts_with(|c: char| c.is_ascii_lowercase()) {
                return name.to_string();
            }
            return format!("{}.{rest}", self.qualify(first));
        }
        if let Some(declared) = self.declared.get(name) {
            return declared.qualified.clone();
        }
        if let Some(imported) = self.imports.get(name) {
            return imported.clone();
        }
        if JAVA_LANG.contains(&name) {
            return format!("java.lang.{name}");
        }
        for package in &self.on_demand {
            let exported = PACKAGES
                .iter()
                .any(|(pkg, names)| pkg == package && names.contains(&name));
            if exported {
                return format!("{package}.{name}");
            }
        }
        if name.len() == 1 && name.starts_with(|c: char| c.is_ascii_uppercase()) {
            // Type variable; its erasure is the bound, assumed `Object`.
            return OBJECT.to_string();
        }
        match &self.package {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }
}

fn is_var(ast: &Ast, ty: NodeId) -> bool {
    matches!(ast.kind(ty), NodeKind::TypeRef { text } if text == "var")
}

fn is_primitive(name: &str) -> bool {
    TypeDescriptor::named(name).is_primitive()
}

fn element_type(iterable: &TypeDescriptor) -> Option<TypeDescriptor> {
    if iterable.is_array() {
        return iterable.component_type();
    }
    iterable.type_arguments.first().cloned()
}

fn default_constructor(created: &TypeDescriptor) -> MethodBinding {
    let simple = created
        .qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(&created.qualified_name)
        .to_string();
    MethodBinding {
        declaring_type: created.qualified_name.clone(),
        name: simple,
        parameter_types: Vec::new(),
        return_type: created.clone(),
        is_static: false,
        is_constructor: true,
        is_varargs: false,
    }
}

fn library_return_type(ret: &str, receiver: Option<&TypeDescriptor>) -> TypeDescriptor {
    let type_arg = |idx: usize| {
        receiver
            .and_then(|r| r.type_arguments.get(idx).cloned())
            .unwrap_or_else(|| TypeDescriptor::named(OBJECT))
    };
    match ret {
        "$0" => type_arg(0),
        "$1" => type_arg(1),
        _ => {
            let mut ty = TypeDescriptor::named(ret.trim_end_matches("[]"));
            for _ in 0..ret.matches("[]").count() {
                ty = TypeDescriptor::array_of(ty);
            }
            ty
        }
    }
}

fn split_type_args(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

const NUMERIC_RANK: &[&str] = &["byte", "short", "char", "int", "long", "float", "double"];

fn widens(from: &str, to: &str) -> bool {
    let rank = |name: &str| NUMERIC_RANK.iter().position(|n| *n == name);
    match (rank(from), rank(to)) {
        (Some(from), Some(to)) => from <= to && !(from == 2 && to < 3),
        _ => false,
    }
}

fn boxed(primitive: &str) -> Option<&'static str> {
    Some(match primitive {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "short" => "java.lang.Short",
        "char" => "java.lang.Character",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "float" => "java.lang.Float",
        "double" => "java.lang.Double",
        _ => return None,
    })
}

fn unboxed(name: &str) -> Option<&str> {
    if is_primitive(name) {
        return Some(name);
    }
    ["boolean", "byte", "short", "char", "int", "long", "float", "double"]
        .into_iter()
        .find(|p| boxed(p) == Some(name))
}

fn number_literal(text: &str) -> (&'static str, Option<ConstantValue>) {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let hex = lower.starts_with("0x");
    if let Some(digits) = lower.strip_suffix('l') {
        return ("long", parse_int(digits, hex).map(ConstantValue::Long));
    }
    if !hex {
        if let Some(digits) = lower.strip_suffix('f') {
            return ("float", digits.parse().ok().map(ConstantValue::Float));
        }
        if let Some(digits) = lower.strip_suffix('d') {
            return ("double", digits.parse().ok().map(ConstantValue::Double));
        }
        if lower.contains(['.', 'e']) {
            return ("double", lower.parse().ok().map(ConstantValue::Double));
        }
    }
    ("int", parse_int(&lower, hex).map(ConstantValue::Int))
}

fn parse_int(digits: &str, hex: bool) -> Option<i64> {
    if hex {
        i64::from_str_radix(&digits[2..], 16).ok()
    } else {
        digits.parse().ok()
    }
}

fn unescape(body: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            _ => return None,
        });
    }
    Some(out)
}

/// Constant value of a literal initializer, before any resolution has run.
fn literal_constant(ast: &Ast, expr: NodeId) -> Option<ConstantValue> {
    match ast.kind(ast.unparenthesize(expr)) {
        NodeKind::Literal {
            kind: LiteralKind::Boolean(value),
            ..
        } => Some(ConstantValue::Boolean(*value)),
        NodeKind::Literal {
            kind: LiteralKind::Number,
            text,
        } => number_literal(text).1,
        NodeKind::Literal {
            kind: LiteralKind::String,
            text,
        } => unescape(&text[1..text.len() - 1]).map(ConstantValue::String),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::{find_node, parse_fixture};
    use jclean_ast::{ConstantValue, NodeKind, TypeDescriptor};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"
import java.util.*;

class Box extends Base {
    static final boolean DEBUG = false;
    private List<String> items;
    int count;

    boolean isFull() { return count > 3; }

    void fill(String[] values, Boolean flag) {
        for (String value : values) {
            items.add(value);
        }
        String first = items.get(0);
        Collections.addAll(items, values);
        boolean b = !DEBUG;
        long total = count + 1L;
        System.out.println(flag);
    }
}
"#;

    #[test]
    fn resolves_locals_fields_and_library_calls() {
        let unit = parse_fixture(SOURCE);
        let ast = &unit.ast;
        let oracle = &unit.oracle;

        let add = find_node(ast, SOURCE, "items.add(value)");
        let binding = oracle.method_of(add).expect("add resolves");
        assert_eq!(binding.declaring_type, "java.util.Collection");
        assert!(binding.has_erased_parameters(&["java.lang.Object"]));

        let get = find_node(ast, SOURCE, "items.get(0)");
        assert_eq!(
            oracle.type_of(get),
            Some(TypeDescriptor::named("java.lang.String"))
        );

        let add_all = find_node(ast, SOURCE, "Collections.addAll(items, values)");
        let binding = oracle.method_of(add_all).expect("addAll resolves");
        assert!(binding.is_static && binding.is_varargs);

        let NodeKind::MethodCall {
            receiver: Some(items),
            ..
        } = ast.kind(add)
        else {
            panic!("expected a call with a receiver");
        };
        let variable = oracle.variable_of(*items).expect("field resolves");
        assert!(variable.is_field);
        assert_eq!(variable.ty.type_arguments.len(), 1);

        let println = find_node(ast, SOURCE, "System.out.println(flag)");
        assert_eq!(
            oracle.method_of(println).map(|m| m.declaring_type),
            Some("java.io.PrintStream".to_string())
        );
    }

    #[test]
    fn folds_constants_through_final_fields() {
        let unit = parse_fixture(SOURCE);
        let not_debug = find_node(&unit.ast, SOURCE, "!DEBUG");
        assert_eq!(
            unit.oracle.constant_value(not_debug),
            Some(ConstantValue::Boolean(true))
        );

        let total = find_node(&unit.ast, SOURCE, "count + 1L");
        assert_eq!(unit.oracle.type_of(total), Some(TypeDescriptor::named("long")));
    }

    #[test]
    fn subtyping_follows_declared_and_library_hierarchies() {
        let unit = parse_fixture(SOURCE);
        let oracle = &unit.oracle;
        assert!(oracle.is_subtype("java.util.ArrayList", "java.util.Collection"));
        assert!(oracle.is_subtype("Box", "Base"));
        assert!(oracle.is_subtype("Box", "java.lang.Object"));
        assert!(!oracle.is_subtype("java.util.List", "java.util.Set"));
    }
}
