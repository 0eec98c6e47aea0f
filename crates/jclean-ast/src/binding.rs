use crate::NodeId;

/// A resolved type, by fully qualified erasure plus its type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// `int`, `java.lang.String`, `java.util.List`; arrays use the element name.
    pub qualified_name: String,
    pub type_arguments: Vec<TypeDescriptor>,
    pub array_dimensions: u8,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

impl TypeDescriptor {
    pub fn named(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_arguments: Vec::new(),
            array_dimensions: 0,
        }
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        Self {
            array_dimensions: component.array_dimensions + 1,
            ..component
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0
    }

    /// Element type of an array, one dimension down.
    pub fn component_type(&self) -> Option<TypeDescriptor> {
        (self.array_dimensions > 0).then(|| TypeDescriptor {
            qualified_name: self.qualified_name.clone(),
            type_arguments: self.type_arguments.clone(),
            array_dimensions: self.array_dimensions - 1,
        })
    }

    pub fn is_primitive(&self) -> bool {
        self.array_dimensions == 0 && PRIMITIVES.contains(&self.qualified_name.as_str())
    }

    pub fn is_named(&self, qualified_name: &str) -> bool {
        self.array_dimensions == 0 && self.qualified_name == qualified_name
    }

    pub fn is_boolean(&self) -> bool {
        self.is_named("boolean")
    }

    pub fn is_boolean_object(&self) -> bool {
        self.is_named("java.lang.Boolean")
    }

    /// `boolean` or `java.lang.Boolean`.
    pub fn is_boolean_like(&self) -> bool {
        self.is_boolean() || self.is_boolean_object()
    }

    /// Erasure as written in Java, e.g. `java.lang.String[]`.
    pub fn erasure(&self) -> String {
        let mut out = self.qualified_name.clone();
        for _ in 0..self.array_dimensions {
            out.push_str("[]");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodBinding {
    pub declaring_type: String,
    pub name: String,
    /// Erased parameter types, e.g. `java.lang.Object`.
    pub parameter_types: Vec<String>,
    pub return_type: TypeDescriptor,
    pub is_static: bool,
    pub is_constructor: bool,
    pub is_varargs: bool,
}

impl MethodBinding {
    pub fn has_erased_parameters(&self, parameter_types: &[&str]) -> bool {
        self.parameter_types.len() == parameter_types.len()
            && self
                .parameter_types
                .iter()
                .zip(parameter_types)
                .all(|(have, want)| have == want)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableBinding {
    pub id: VariableId,
    pub name: String,
    pub ty: TypeDescriptor,
    pub is_field: bool,
    pub is_final: bool,
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Boolean(bool),
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    Char(char),
    String(String),
}

impl ConstantValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstantValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// Read-only semantic queries over one parsed unit.
///
/// Every query may answer `None` for "unresolved". Callers decline to transform
/// instead of guessing.
pub trait TypeOracle {
    fn type_of(&self, expr: NodeId) -> Option<TypeDescriptor>;

    /// Binding of a method call, super method call or instance creation.
    fn method_of(&self, call: NodeId) -> Option<MethodBinding>;

    /// Binding of a simple name, qualified name, field access or declared name.
    fn variable_of(&self, name: NodeId) -> Option<VariableBinding>;

    fn constant_value(&self, expr: NodeId) -> Option<ConstantValue>;

    /// Whether `sub` is `sup` or one of its subtypes, by qualified name.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        sub == sup
    }
}

/// Oracle for hosts without semantic information.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnresolvedOracle;

impl TypeOracle for UnresolvedOracle {
    fn type_of(&self, _expr: NodeId) -> Option<TypeDescriptor> {
        None
    }

    fn method_of(&self, _call: NodeId) -> Option<MethodBinding> {
        None
    }

    fn variable_of(&self, _name: NodeId) -> Option<VariableBinding> {
        None
    }

    fn constant_value(&self, _expr: NodeId) -> Option<ConstantValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_descriptors() {
        let strings = TypeDescriptor::array_of(TypeDescriptor::named("java.lang.String"));
        assert!(strings.is_array());
        assert!(!strings.is_primitive());
        assert_eq!(strings.erasure(), "java.lang.String[]");
        assert_eq!(
            strings.component_type(),
            Some(TypeDescriptor::named("java.lang.String"))
        );
        assert_eq!(TypeDescriptor::named("int").component_type(), None);
    }

    #[test]
    fn boolean_like_types() {
        assert!(TypeDescriptor::named("boolean").is_boolean_like());
        assert!(TypeDescriptor::named("java.lang.Boolean").is_boolean_like());
        assert!(!TypeDescriptor::array_of(TypeDescriptor::named("boolean")).is_boolean_like());
    }
}
