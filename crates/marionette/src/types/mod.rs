//! The type lattice.
//!
//! Types are values in this language (`Integer[1, 10]` is an expression),
//! so [`Type`] is a plain data enum with structural equality. The three
//! fundamental relations — assignability, instance-of, and generalization —
//! live in [`assign`]; recursive aliases are traversed through
//! [`guard::RecursionGuard`].

pub mod assign;
pub mod convert;
pub mod guard;
pub mod parse;

use std::cell::{Ref, RefCell};
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::value::{Value, ValueRegex};

/// Unbounded integer range endpoints.
pub const INTEGER_MIN: i64 = i64::MIN;
pub const INTEGER_MAX: i64 = i64::MAX;

/// A named alias for another type, shared by handle.
///
/// The resolved type is filled in after registration so aliases may refer
/// to themselves (`type Tree = Variant[Integer, Hash[String, Tree]]`).
/// Equality and hashing use the name; traversal identity uses the handle
/// pointer (see [`guard`]).
#[derive(Debug, Clone)]
pub struct AliasType {
    name: String,
    resolved: Rc<RefCell<Type>>,
}

impl AliasType {
    /// Creates an alias whose resolved type is a placeholder (`Any`) until
    /// [`AliasType::resolve`] is called.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: Rc::new(RefCell::new(Type::Any)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the resolved type. Called once, after the alias body has been
    /// evaluated against a registry that already contains this alias.
    pub fn resolve(&self, resolved: Type) {
        *self.resolved.borrow_mut() = resolved;
    }

    /// Borrows the resolved type.
    #[must_use]
    pub fn resolved(&self) -> Ref<'_, Type> {
        self.resolved.borrow()
    }

    /// Identity of the shared resolved-type handle, used as a recursion
    /// guard key.
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.resolved) as usize
    }

    /// Identity after following any chain of aliases to a non-alias type.
    #[must_use]
    pub fn dereferenced_identity(&self) -> usize {
        let mut current = self.clone();
        loop {
            let next = match &*current.resolved() {
                Type::Alias(inner) => inner.clone(),
                _ => return current.identity(),
            };
            current = next;
        }
    }
}

impl PartialEq for AliasType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AliasType {}

impl Hash for AliasType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// One member of a `Struct` schema: the key type (an `Enum` of one string,
/// possibly wrapped in `Optional` or `NotUndef`) and the value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructMember {
    pub key: Type,
    pub value: Type,
}

impl StructMember {
    /// The member's key string, projected from the key type.
    #[must_use]
    pub fn key_name(&self) -> Option<&str> {
        struct_key_name(&self.key)
    }

    /// True when the member may be absent from an instance (key wrapped in
    /// `Optional`).
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self.key, Type::Optional(_))
    }
}

fn struct_key_name(key: &Type) -> Option<&str> {
    match key {
        Type::Enum(strings) if strings.len() == 1 => Some(&strings[0]),
        Type::Optional(Some(inner)) | Type::NotUndef(Some(inner)) => struct_key_name(inner),
        _ => None,
    }
}

/// A callable signature: parameter types (the last type is variadic over
/// any extra arguments), an argument count range, and an optional block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableType {
    pub params: Vec<Type>,
    pub min: usize,
    pub max: usize,
    pub block: Option<Box<Type>>,
    pub block_required: bool,
}

impl CallableType {
    /// A signature accepting any arguments and no block.
    #[must_use]
    pub fn any() -> Self {
        Self {
            params: Vec::new(),
            min: 0,
            max: usize::MAX,
            block: None,
            block_required: false,
        }
    }
}

/// The type lattice: a tagged variant with `Any` at the top.
///
/// Range invariants (`from <= to`) are established by the constructors in
/// [`parse`] and assumed everywhere else.
#[derive(Debug, Clone)]
pub enum Type {
    Any,
    Scalar,
    Numeric,
    Integer { from: i64, to: i64 },
    Float { from: f64, to: f64 },
    Boolean,
    String { min: i64, max: i64 },
    Enum(Vec<String>),
    Pattern(Vec<ValueRegex>),
    Regexp,
    Undef,
    Default,
    NotUndef(Option<Box<Type>>),
    Optional(Option<Box<Type>>),
    Array { element: Box<Type>, from: i64, to: i64 },
    Hash { key: Box<Type>, value: Box<Type>, from: i64, to: i64 },
    Tuple { types: Vec<Type>, from: i64, to: i64 },
    Struct(Vec<StructMember>),
    Iterable(Option<Box<Type>>),
    Iterator(Option<Box<Type>>),
    Collection,
    CatalogEntry,
    /// A resource reference: `Resource`, `Notify`, or `Notify[title]`.
    Resource { type_name: Option<String>, title: Option<String> },
    /// A class reference: `Class` or `Class[name]`.
    Class { title: Option<String> },
    Variant(Vec<Type>),
    Type(Option<Box<Type>>),
    Data,
    Callable(CallableType),
    Runtime { runtime: Option<String>, type_name: Option<String> },
    Alias(AliasType),
}

impl Type {
    /// An unbounded integer type.
    #[must_use]
    pub const fn integer() -> Self {
        Self::Integer {
            from: INTEGER_MIN,
            to: INTEGER_MAX,
        }
    }

    /// An unbounded float type.
    #[must_use]
    pub const fn float() -> Self {
        Self::Float {
            from: f64::NEG_INFINITY,
            to: f64::INFINITY,
        }
    }

    /// An unbounded string type.
    #[must_use]
    pub const fn string() -> Self {
        Self::String {
            min: 0,
            max: INTEGER_MAX,
        }
    }

    /// A resource reference for a (normalized) type name and title.
    #[must_use]
    pub fn resource(type_name: &str, title: &str) -> Self {
        Self::Resource {
            type_name: Some(normalize_type_name(type_name)),
            title: Some(title.to_owned()),
        }
    }

    /// A class reference for a (lowercased) class name.
    #[must_use]
    pub fn class(title: &str) -> Self {
        Self::Class {
            title: Some(title.trim_start_matches("::").to_ascii_lowercase()),
        }
    }

    /// Builds a `Variant`, flattening nested variants and deduplicating
    /// members by structural equality.
    #[must_use]
    pub fn variant(types: Vec<Self>) -> Self {
        let mut members: Vec<Self> = Vec::with_capacity(types.len());
        for t in types {
            match t {
                Self::Variant(nested) => {
                    for member in nested {
                        if !members.contains(&member) {
                            members.push(member);
                        }
                    }
                }
                other => {
                    if !members.contains(&other) {
                        members.push(other);
                    }
                }
            }
        }
        Self::Variant(members)
    }

    /// True for `Class[...]` and resource references with both parameters,
    /// the operand shapes relationship operators accept.
    #[must_use]
    pub fn is_catalog_reference(&self) -> bool {
        matches!(
            self,
            Self::Class { title: Some(_) }
                | Self::Resource {
                    type_name: Some(_),
                    title: Some(_)
                }
        )
    }

    /// The bounded integer range an `Integer[a, b]` type iterates over.
    #[must_use]
    pub fn iterable_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Integer { from, to } if *from != INTEGER_MIN && *to != INTEGER_MAX && from <= to => {
                Some((*from, *to))
            }
            _ => None,
        }
    }
}

/// Normalizes a resource type name: lowercase the whole name, then
/// capitalize the first character of each `::` segment.
#[must_use]
pub fn normalize_type_name(name: &str) -> String {
    let name = name.trim_start_matches("::").to_ascii_lowercase();
    let mut result = String::with_capacity(name.len());
    for (index, segment) in name.split("::").enumerate() {
        if index > 0 {
            result.push_str("::");
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

/// Infers the type of a value.
///
/// Inference is deliberately shallow: collection values report `Array[Any]`
/// and `Hash[Any, Any]`; deep checks go through `is_instance`.
#[must_use]
pub fn type_of(value: &Value) -> Type {
    match value {
        Value::Undef => Type::Undef,
        Value::Default => Type::Default,
        Value::Boolean(_) => Type::Boolean,
        Value::Integer(_) => Type::integer(),
        Value::Float(_) => Type::float(),
        Value::String(_) => Type::string(),
        Value::Regex(_) => Type::Regexp,
        Value::Type(t) => Type::Type(Some(Box::new(t.clone()))),
        Value::Array(_) => Type::Array {
            element: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        Value::Hash(_) => Type::Hash {
            key: Box::new(Type::Any),
            value: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        Value::Iterator(_) => Type::Iterator(Some(Box::new(Type::Any))),
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        use Type as T;
        match (self, other) {
            (T::Any, T::Any)
            | (T::Scalar, T::Scalar)
            | (T::Numeric, T::Numeric)
            | (T::Boolean, T::Boolean)
            | (T::Regexp, T::Regexp)
            | (T::Undef, T::Undef)
            | (T::Default, T::Default)
            | (T::Collection, T::Collection)
            | (T::CatalogEntry, T::CatalogEntry)
            | (T::Data, T::Data) => true,
            (T::Integer { from: a, to: b }, T::Integer { from: c, to: d }) => a == c && b == d,
            (T::Float { from: a, to: b }, T::Float { from: c, to: d }) => {
                a.to_bits() == c.to_bits() && b.to_bits() == d.to_bits()
            }
            (T::String { min: a, max: b }, T::String { min: c, max: d }) => a == c && b == d,
            (T::Enum(a), T::Enum(b)) => a == b,
            (T::Pattern(a), T::Pattern(b)) => a == b,
            (T::NotUndef(a), T::NotUndef(b)) | (T::Optional(a), T::Optional(b)) | (T::Type(a), T::Type(b)) => a == b,
            (
                T::Array { element: a, from: b, to: c },
                T::Array { element: d, from: e, to: f },
            ) => a == d && b == e && c == f,
            (
                T::Hash { key: a, value: b, from: c, to: d },
                T::Hash { key: e, value: f, from: g, to: h },
            ) => a == e && b == f && c == g && d == h,
            (
                T::Tuple { types: a, from: b, to: c },
                T::Tuple { types: d, from: e, to: f },
            ) => a == d && b == e && c == f,
            (T::Struct(a), T::Struct(b)) => a == b,
            (T::Iterable(a), T::Iterable(b)) | (T::Iterator(a), T::Iterator(b)) => a == b,
            (
                T::Resource { type_name: a, title: b },
                T::Resource { type_name: c, title: d },
            ) => a == c && b == d,
            (T::Class { title: a }, T::Class { title: b }) => a == b,
            (T::Variant(a), T::Variant(b)) => a == b,
            (T::Callable(a), T::Callable(b)) => a == b,
            (
                T::Runtime { runtime: a, type_name: b },
                T::Runtime { runtime: c, type_name: d },
            ) => a == c && b == d,
            (T::Alias(a), T::Alias(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Any
            | Self::Scalar
            | Self::Numeric
            | Self::Boolean
            | Self::Regexp
            | Self::Undef
            | Self::Default
            | Self::Collection
            | Self::CatalogEntry
            | Self::Data => {}
            Self::Integer { from, to } => {
                from.hash(state);
                to.hash(state);
            }
            Self::Float { from, to } => {
                from.to_bits().hash(state);
                to.to_bits().hash(state);
            }
            Self::String { min, max } => {
                min.hash(state);
                max.hash(state);
            }
            Self::Enum(strings) => strings.hash(state),
            Self::Pattern(patterns) => patterns.hash(state),
            Self::NotUndef(inner) | Self::Optional(inner) | Self::Type(inner) => inner.hash(state),
            Self::Array { element, from, to } => {
                element.hash(state);
                from.hash(state);
                to.hash(state);
            }
            Self::Hash { key, value, from, to } => {
                key.hash(state);
                value.hash(state);
                from.hash(state);
                to.hash(state);
            }
            Self::Tuple { types, from, to } => {
                types.hash(state);
                from.hash(state);
                to.hash(state);
            }
            Self::Struct(members) => members.hash(state),
            Self::Iterable(inner) | Self::Iterator(inner) => inner.hash(state),
            Self::Resource { type_name, title } => {
                type_name.hash(state);
                title.hash(state);
            }
            Self::Class { title } => title.hash(state),
            Self::Variant(types) => types.hash(state),
            Self::Callable(signature) => signature.hash(state),
            Self::Runtime { runtime, type_name } => {
                runtime.hash(state);
                type_name.hash(state);
            }
            Self::Alias(alias) => alias.hash(state),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Scalar => f.write_str("Scalar"),
            Self::Numeric => f.write_str("Numeric"),
            Self::Boolean => f.write_str("Boolean"),
            Self::Regexp => f.write_str("Regexp"),
            Self::Undef => f.write_str("Undef"),
            Self::Default => f.write_str("Default"),
            Self::Collection => f.write_str("Collection"),
            Self::CatalogEntry => f.write_str("CatalogEntry"),
            Self::Data => f.write_str("Data"),
            Self::Integer { from, to } => {
                f.write_str("Integer")?;
                write_integer_range(f, *from, *to, INTEGER_MIN, INTEGER_MAX)
            }
            Self::Float { from, to } => {
                f.write_str("Float")?;
                if from.is_infinite() && to.is_infinite() {
                    return Ok(());
                }
                f.write_char('[')?;
                if from.is_infinite() {
                    f.write_str("default")?;
                } else {
                    write_float(f, *from)?;
                }
                f.write_str(", ")?;
                if to.is_infinite() {
                    f.write_str("default")?;
                } else {
                    write_float(f, *to)?;
                }
                f.write_char(']')
            }
            Self::String { min, max } => {
                f.write_str("String")?;
                write_integer_range(f, *min, *max, 0, INTEGER_MAX)
            }
            Self::Enum(strings) => {
                f.write_str("Enum")?;
                if strings.is_empty() {
                    return Ok(());
                }
                f.write_char('[')?;
                for (index, s) in strings.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{s}'")?;
                }
                f.write_char(']')
            }
            Self::Pattern(patterns) => {
                f.write_str("Pattern")?;
                if patterns.is_empty() {
                    return Ok(());
                }
                f.write_char('[')?;
                for (index, pattern) in patterns.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "/{}/", pattern.source())?;
                }
                f.write_char(']')
            }
            Self::NotUndef(inner) => write_wrapped(f, "NotUndef", inner.as_deref()),
            Self::Optional(inner) => write_wrapped(f, "Optional", inner.as_deref()),
            Self::Type(inner) => write_wrapped(f, "Type", inner.as_deref()),
            Self::Iterable(inner) => write_wrapped(f, "Iterable", inner.as_deref()),
            Self::Iterator(inner) => write_wrapped(f, "Iterator", inner.as_deref()),
            Self::Array { element, from, to } => {
                write!(f, "Array[{element}")?;
                if *from != 0 || *to != INTEGER_MAX {
                    write!(f, ", {}", Bound(*from, INTEGER_MIN))?;
                    if *to != INTEGER_MAX {
                        write!(f, ", {to}")?;
                    }
                }
                f.write_char(']')
            }
            Self::Hash { key, value, from, to } => {
                write!(f, "Hash[{key}, {value}")?;
                if *from != 0 || *to != INTEGER_MAX {
                    write!(f, ", {}", Bound(*from, INTEGER_MIN))?;
                    if *to != INTEGER_MAX {
                        write!(f, ", {to}")?;
                    }
                }
                f.write_char(']')
            }
            Self::Tuple { types, from, to } => {
                f.write_str("Tuple[")?;
                for (index, t) in types.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                let default_len = types.len() as i64;
                if *from != default_len || *to != default_len {
                    write!(f, ", {from}")?;
                    if *to != INTEGER_MAX {
                        write!(f, ", {to}")?;
                    }
                }
                f.write_char(']')
            }
            Self::Struct(members) => {
                f.write_str("Struct[{")?;
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    match member.key_name() {
                        Some(name) if member.is_optional() => write!(f, "Optional['{name}'] => {}", member.value)?,
                        Some(name) => write!(f, "'{name}' => {}", member.value)?,
                        None => write!(f, "{} => {}", member.key, member.value)?,
                    }
                }
                f.write_str("}]")
            }
            Self::Resource { type_name, title } => {
                match type_name {
                    None => f.write_str("Resource")?,
                    Some(name) => f.write_str(name)?,
                }
                if let Some(title) = title {
                    write!(f, "[{title}]")?;
                }
                Ok(())
            }
            Self::Class { title } => {
                f.write_str("Class")?;
                if let Some(title) = title {
                    write!(f, "[{title}]")?;
                }
                Ok(())
            }
            Self::Variant(types) => {
                f.write_str("Variant")?;
                if types.is_empty() {
                    return Ok(());
                }
                f.write_char('[')?;
                for (index, t) in types.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_char(']')
            }
            Self::Callable(signature) => {
                f.write_str("Callable")?;
                if signature.params.is_empty() && signature.min == 0 && signature.max == usize::MAX {
                    return Ok(());
                }
                f.write_char('[')?;
                for (index, t) in signature.params.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                if signature.min != signature.params.len() || signature.max != signature.params.len() {
                    if !signature.params.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", signature.min)?;
                    f.write_str(", ")?;
                    if signature.max == usize::MAX {
                        f.write_str("default")?;
                    } else {
                        write!(f, "{}", signature.max)?;
                    }
                }
                f.write_char(']')
            }
            Self::Runtime { runtime, type_name } => {
                f.write_str("Runtime")?;
                if let Some(runtime) = runtime {
                    write!(f, "['{runtime}'")?;
                    if let Some(type_name) = type_name {
                        write!(f, ", '{type_name}'")?;
                    }
                    f.write_char(']')?;
                }
                Ok(())
            }
            Self::Alias(alias) => f.write_str(alias.name()),
        }
    }
}

/// Renders a range bound, using `default` for the unbounded sentinel.
struct Bound(i64, i64);

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == self.1 {
            f.write_str("default")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn write_integer_range(
    f: &mut fmt::Formatter<'_>,
    from: i64,
    to: i64,
    unbounded_from: i64,
    unbounded_to: i64,
) -> fmt::Result {
    if from == unbounded_from && to == unbounded_to {
        return Ok(());
    }
    write!(f, "[{}", Bound(from, unbounded_from))?;
    if to != unbounded_to {
        write!(f, ", {to}")?;
    }
    f.write_char(']')
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let mut buffer = ryu::Buffer::new();
    f.write_str(buffer.format(value))
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, name: &str, inner: Option<&Type>) -> fmt::Result {
    f.write_str(name)?;
    if let Some(inner) = inner {
        write!(f, "[{inner}]")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_resource_type_names() {
        assert_eq!(normalize_type_name("notify"), "Notify");
        assert_eq!(normalize_type_name("foo::bar"), "Foo::Bar");
        assert_eq!(normalize_type_name("FOO::bAr"), "Foo::Bar");
        assert_eq!(normalize_type_name("::foo"), "Foo");
    }

    #[test]
    fn variant_deduplicates_members() {
        let variant = Type::variant(vec![Type::integer(), Type::Boolean, Type::integer()]);
        let Type::Variant(members) = variant else {
            panic!("expected variant");
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn variant_flattens_nested_variants() {
        let inner = Type::variant(vec![Type::Boolean, Type::Undef]);
        let variant = Type::variant(vec![Type::integer(), inner]);
        let Type::Variant(members) = variant else {
            panic!("expected variant");
        };
        assert_eq!(members.len(), 3);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::integer().to_string(), "Integer");
        assert_eq!(Type::Integer { from: 3, to: 5 }.to_string(), "Integer[3, 5]");
        assert_eq!(
            Type::Integer { from: INTEGER_MIN, to: 5 }.to_string(),
            "Integer[default, 5]"
        );
        assert_eq!(Type::resource("notify", "a").to_string(), "Notify[a]");
        assert_eq!(Type::class("Base").to_string(), "Class[base]");
        assert_eq!(
            Type::Optional(Some(Box::new(Type::string()))).to_string(),
            "Optional[String]"
        );
    }

    #[test]
    fn alias_equality_is_by_name() {
        let a = AliasType::new("Tree");
        let b = AliasType::new("Tree");
        assert_eq!(a, b);
        assert_ne!(a.identity(), b.identity());
    }
}
