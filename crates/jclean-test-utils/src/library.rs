//! The slice of the JDK that fixtures may call into.

/// A library method. `$0`/`$1` in the return type stand for the receiver's
/// type arguments.
pub(crate) struct LibraryMethod {
    pub owner: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub ret: &'static str,
    pub is_static: bool,
    pub varargs: bool,
}

const fn instance(
    owner: &'static str,
    name: &'static str,
    params: &'static [&'static str],
    ret: &'static str,
) -> LibraryMethod {
    LibraryMethod {
        owner,
        name,
        params,
        ret,
        is_static: false,
        varargs: false,
    }
}

const OBJECT: &str = "java.lang.Object";
const COLLECTION: &str = "java.util.Collection";
const LIST: &str = "java.util.List";
const MAP: &str = "java.util.Map";
const STRING: &str = "java.lang.String";
const ATOMIC_INTEGER: &str = "java.util.concurrent.atomic.AtomicInteger";

pub(crate) const METHODS: &[LibraryMethod] = &[
    instance(OBJECT, "equals", &[OBJECT], "boolean"),
    instance(OBJECT, "hashCode", &[], "int"),
    instance(OBJECT, "toString", &[], STRING),
    instance(OBJECT, "getClass", &[], "java.lang.Class"),
    instance("java.lang.Iterable", "iterator", &[], "java.util.Iterator"),
    instance(COLLECTION, "add", &[OBJECT], "boolean"),
    instance(COLLECTION, "remove", &[OBJECT], "boolean"),
    instance(COLLECTION, "addAll", &[COLLECTION], "boolean"),
    instance(COLLECTION, "removeAll", &[COLLECTION], "boolean"),
    instance(COLLECTION, "contains", &[OBJECT], "boolean"),
    instance(COLLECTION, "containsAll", &[COLLECTION], "boolean"),
    instance(COLLECTION, "size", &[], "int"),
    instance(COLLECTION, "isEmpty", &[], "boolean"),
    instance(COLLECTION, "clear", &[], "void"),
    instance("java.util.Set", "add", &[OBJECT], "boolean"),
    instance("java.util.Set", "remove", &[OBJECT], "boolean"),
    instance(LIST, "get", &["int"], "$0"),
    instance(LIST, "set", &["int", OBJECT], "$0"),
    instance(LIST, "add", &["int", OBJECT], "void"),
    instance(LIST, "remove", &["int"], "$0"),
    instance(LIST, "indexOf", &[OBJECT], "int"),
    instance(MAP, "get", &[OBJECT], "$1"),
    instance(MAP, "put", &[OBJECT, OBJECT], "$1"),
    instance(MAP, "remove", &[OBJECT], "$1"),
    instance(MAP, "containsKey", &[OBJECT], "boolean"),
    instance(MAP, "size", &[], "int"),
    instance(MAP, "isEmpty", &[], "boolean"),
    instance("java.util.Iterator", "hasNext", &[], "boolean"),
    instance("java.util.Iterator", "next", &[], "$0"),
    instance(STRING, "length", &[], "int"),
    instance(STRING, "isEmpty", &[], "boolean"),
    instance(STRING, "charAt", &["int"], "char"),
    instance(STRING, "contains", &["java.lang.CharSequence"], "boolean"),
    instance(STRING, "matches", &[STRING], "boolean"),
    instance(STRING, "startsWith", &[STRING], "boolean"),
    instance(STRING, "substring", &["int"], STRING),
    instance(STRING, "trim", &[], STRING),
    instance("java.lang.StringBuilder", "append", &[OBJECT], "java.lang.StringBuilder"),
    instance("java.lang.Boolean", "booleanValue", &[], "boolean"),
    LibraryMethod {
        owner: "java.lang.Boolean",
        name: "valueOf",
        params: &["boolean"],
        ret: "java.lang.Boolean",
        is_static: true,
        varargs: false,
    },
    instance("java.io.File", "exists", &[], "boolean"),
    instance("java.io.File", "delete", &[], "boolean"),
    instance(ATOMIC_INTEGER, "get", &[], "int"),
    instance(ATOMIC_INTEGER, "getAndIncrement", &[], "int"),
    instance(ATOMIC_INTEGER, "incrementAndGet", &[], "int"),
    instance("java.io.PrintStream", "println", &[OBJECT], "void"),
    LibraryMethod {
        owner: "java.util.Collections",
        name: "addAll",
        params: &[COLLECTION, "java.lang.Object[]"],
        ret: "boolean",
        is_static: true,
        varargs: true,
    },
    LibraryMethod {
        owner: "java.util.Arrays",
        name: "asList",
        params: &["java.lang.Object[]"],
        ret: LIST,
        is_static: true,
        varargs: true,
    },
];

/// Direct supertypes of library types. `java.lang.Object` is implicit.
pub(crate) const SUPERTYPES: &[(&str, &[&str])] = &[
    (COLLECTION, &["java.lang.Iterable"]),
    (LIST, &[COLLECTION]),
    ("java.util.Set", &[COLLECTION]),
    ("java.util.Queue", &[COLLECTION]),
    ("java.util.Deque", &["java.util.Queue"]),
    ("java.util.ArrayList", &[LIST]),
    ("java.util.LinkedList", &[LIST, "java.util.Deque"]),
    ("java.util.HashSet", &["java.util.Set"]),
    ("java.util.LinkedHashSet", &["java.util.HashSet"]),
    ("java.util.TreeSet", &["java.util.Set"]),
    ("java.util.HashMap", &[MAP]),
    ("java.util.LinkedHashMap", &["java.util.HashMap"]),
    ("java.util.TreeMap", &[MAP]),
    (STRING, &["java.lang.CharSequence"]),
    ("java.lang.StringBuilder", &["java.lang.CharSequence"]),
    ("java.lang.Integer", &["java.lang.Number"]),
    ("java.lang.Long", &["java.lang.Number"]),
    ("java.lang.Double", &["java.lang.Number"]),
    ("java.lang.RuntimeException", &["java.lang.Exception"]),
    ("java.lang.IllegalArgumentException", &["java.lang.RuntimeException"]),
    ("java.lang.IllegalStateException", &["java.lang.RuntimeException"]),
    ("java.lang.Exception", &["java.lang.Throwable"]),
];

/// Library fields: (owner, name, type).
pub(crate) const FIELDS: &[(&str, &str, &str)] = &[
    ("java.lang.Boolean", "TRUE", "java.lang.Boolean"),
    ("java.lang.Boolean", "FALSE", "java.lang.Boolean"),
    ("java.lang.System", "out", "java.io.PrintStream"),
    ("java.lang.System", "err", "java.io.PrintStream"),
];

pub(crate) const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "Boolean",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Character",
    "Double",
    "Float",
    "Number",
    "Math",
    "System",
    "Iterable",
    "CharSequence",
    "StringBuilder",
    "Class",
    "Comparable",
    "Throwable",
    "Exception",
    "RuntimeException",
    "IllegalArgumentException",
    "IllegalStateException",
];

/// Packages searched for on-demand imports, with the names they export.
pub(crate) const PACKAGES: &[(&str, &[&str])] = &[
    (
        "java.util",
        &[
            "Collection",
            "List",
            "ArrayList",
            "LinkedList",
            "Set",
            "HashSet",
            "LinkedHashSet",
            "TreeSet",
            "Map",
            "HashMap",
            "LinkedHashMap",
            "TreeMap",
            "Queue",
            "Deque",
            "Iterator",
            "Collections",
            "Arrays",
            "Objects",
        ],
    ),
    ("java.util.concurrent.atomic", &["AtomicInteger"]),
    ("java.io", &["File", "PrintStream"]),
];
