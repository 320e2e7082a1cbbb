//! The three fundamental type relations: assignability, instance-of, and
//! generalization.
//!
//! Both relations take a [`RecursionGuard`] because aliases may reference
//! themselves; every public entry point has a guard-free convenience
//! wrapper. Dispatch is a closed match over the variant — there is no
//! runtime polymorphism in the lattice.

use crate::types::guard::{Entry, RecursionGuard, identity_of};
use crate::types::{AliasType, CallableType, INTEGER_MAX, StructMember, Type, type_of};
use crate::value::{Value, iterator};

impl Type {
    /// Convenience wrapper over [`Type::is_assignable`] with a fresh guard.
    #[must_use]
    pub fn assignable_from(&self, other: &Self) -> bool {
        self.is_assignable(other, &mut RecursionGuard::new())
    }

    /// Convenience wrapper over [`Type::is_instance`] with a fresh guard.
    #[must_use]
    pub fn instance_of(&self, value: &Value) -> bool {
        self.is_instance(value, &mut RecursionGuard::new())
    }

    /// True when a value of type `other` is acceptable where `self` is
    /// required.
    pub fn is_assignable(&self, other: &Self, guard: &mut RecursionGuard) -> bool {
        // An alias on the right unwraps through the guard so recursive
        // aliases terminate; variants and aliases on the left handle the
        // right side themselves.
        if let Self::Alias(other_alias) = other {
            if !matches!(self, Self::Alias(_)) {
                return match guard.enter(other_alias, identity_of(self)) {
                    Entry::Recursed(value) => value,
                    Entry::First(key) => {
                        let result = self.is_assignable(&other_alias.resolved(), guard);
                        guard.store(key, result);
                        result
                    }
                };
            }
        }
        // A variant on the right must be assignable member-by-member
        if let Self::Variant(members) = other {
            if !matches!(self, Self::Variant(_) | Self::Alias(_) | Self::Any) {
                return members.iter().all(|member| self.is_assignable(member, guard));
            }
        }

        match self {
            Self::Any => true,
            Self::Scalar => matches!(
                other,
                Self::Scalar
                    | Self::Numeric
                    | Self::Integer { .. }
                    | Self::Float { .. }
                    | Self::String { .. }
                    | Self::Enum(_)
                    | Self::Pattern(_)
                    | Self::Boolean
                    | Self::Regexp
            ),
            Self::Numeric => matches!(other, Self::Numeric | Self::Integer { .. } | Self::Float { .. }),
            Self::Integer { from, to } => match other {
                Self::Integer { from: other_from, to: other_to } => from <= other_from && other_to <= to,
                _ => false,
            },
            Self::Float { from, to } => match other {
                Self::Float { from: other_from, to: other_to } => from <= other_from && other_to <= to,
                _ => false,
            },
            Self::Boolean => matches!(other, Self::Boolean),
            Self::Regexp => matches!(other, Self::Regexp),
            Self::Undef => matches!(other, Self::Undef),
            Self::Default => matches!(other, Self::Default),
            Self::String { min, max } => match other {
                Self::String { min: other_min, max: other_max } => min <= other_min && other_max <= max,
                Self::Enum(strings) => strings.iter().all(|s| {
                    let length = s.chars().count() as i64;
                    *min <= length && length <= *max
                }),
                Self::Pattern(_) => *min <= 0 && *max == INTEGER_MAX,
                _ => false,
            },
            Self::Enum(strings) => match other {
                Self::Enum(other_strings) => other_strings.iter().all(|s| strings.contains(s)),
                _ => false,
            },
            Self::Pattern(patterns) => match other {
                Self::Pattern(other_patterns) => other_patterns
                    .iter()
                    .all(|p| patterns.iter().any(|q| q.source() == p.source())),
                Self::Enum(strings) => strings
                    .iter()
                    .all(|s| patterns.iter().any(|p| p.pattern().is_match(s))),
                _ => false,
            },
            Self::NotUndef(inner) => {
                if accepts_undef(other) {
                    return false;
                }
                match inner {
                    Some(inner) => inner.is_assignable(other, guard),
                    None => true,
                }
            }
            Self::Optional(inner) => {
                if matches!(other, Self::Undef) {
                    return true;
                }
                match inner {
                    Some(inner) => inner.is_assignable(other, guard),
                    None => true,
                }
            }
            Self::Array { element, from, to } => match other {
                Self::Array {
                    element: other_element,
                    from: other_from,
                    to: other_to,
                } => element.is_assignable(other_element, guard) && from <= other_from && other_to <= to,
                Self::Tuple {
                    types,
                    from: other_from,
                    to: other_to,
                } => {
                    types.iter().all(|t| element.is_assignable(t, guard)) && from <= other_from && other_to <= to
                }
                _ => false,
            },
            Self::Hash { key, value, from, to } => match other {
                Self::Hash {
                    key: other_key,
                    value: other_value,
                    from: other_from,
                    to: other_to,
                } => {
                    key.is_assignable(other_key, guard)
                        && value.is_assignable(other_value, guard)
                        && from <= other_from
                        && other_to <= to
                }
                Self::Struct(members) => {
                    let count = members.len() as i64;
                    *from <= count
                        && count <= *to
                        && members.iter().all(|member| {
                            key.is_assignable(&Type::string(), guard) && value.is_assignable(&member.value, guard)
                        })
                }
                _ => false,
            },
            Self::Tuple { types, from, to } => match other {
                Self::Tuple {
                    types: other_types,
                    from: other_from,
                    to: other_to,
                } => {
                    if from > other_from || other_to > to {
                        return false;
                    }
                    other_types.iter().enumerate().all(|(index, other_type)| {
                        let this = types.get(index).or_else(|| types.last());
                        this.is_some_and(|t| t.is_assignable(other_type, guard))
                    })
                }
                Self::Array {
                    element,
                    from: other_from,
                    to: other_to,
                } => {
                    from <= other_from
                        && other_to <= to
                        && types.iter().all(|t| t.is_assignable(element, guard))
                }
                _ => false,
            },
            Self::Struct(members) => match other {
                Self::Struct(other_members) => struct_assignable(members, other_members, guard),
                _ => false,
            },
            Self::Iterable(inner) => match iterable_element(other) {
                Some(element) => match inner {
                    Some(inner) => inner.is_assignable(&element, guard),
                    None => true,
                },
                None => false,
            },
            Self::Iterator(inner) => match other {
                Self::Iterator(other_inner) => match (inner, other_inner) {
                    (Some(inner), Some(other_inner)) => inner.is_assignable(other_inner, guard),
                    (Some(_), None) | (None, _) => inner.is_none() || other_inner.is_none(),
                },
                _ => false,
            },
            Self::Collection => matches!(
                other,
                Self::Collection | Self::Array { .. } | Self::Hash { .. } | Self::Tuple { .. } | Self::Struct(_)
            ),
            Self::CatalogEntry => matches!(
                other,
                Self::CatalogEntry | Self::Resource { .. } | Self::Class { .. }
            ),
            Self::Resource { type_name, title } => match other {
                Self::Resource {
                    type_name: other_name,
                    title: other_title,
                } => {
                    (type_name.is_none() || type_name == other_name)
                        && (title.is_none() || title == other_title)
                }
                _ => false,
            },
            Self::Class { title } => match other {
                Self::Class { title: other_title } => title.is_none() || title == other_title,
                _ => false,
            },
            Self::Variant(members) => match other {
                Self::Variant(other_members) => other_members
                    .iter()
                    .all(|other_member| members.iter().any(|member| member.is_assignable(other_member, guard))),
                _ => members.iter().any(|member| member.is_assignable(other, guard)),
            },
            Self::Type(inner) => match other {
                Self::Type(other_inner) => match (inner, other_inner) {
                    (Some(inner), Some(other_inner)) => inner.is_assignable(other_inner, guard),
                    (Some(_), None) => false,
                    (None, _) => true,
                },
                _ => false,
            },
            Self::Data => data_assignable(other, guard),
            Self::Callable(signature) => match other {
                Self::Callable(other_signature) => callable_assignable(signature, other_signature, guard),
                _ => false,
            },
            Self::Runtime { runtime, type_name } => match other {
                Self::Runtime {
                    runtime: other_runtime,
                    type_name: other_name,
                } => {
                    (runtime.is_none() || runtime == other_runtime)
                        && (type_name.is_none() || type_name == other_name)
                }
                _ => false,
            },
            Self::Alias(alias) => alias_assignable(alias, other, guard),
        }
    }

    /// True when `value` is an instance of this type.
    pub fn is_instance(&self, value: &Value, guard: &mut RecursionGuard) -> bool {
        match self {
            Self::Any => true,
            Self::Scalar => matches!(
                value,
                Value::Integer(_) | Value::Float(_) | Value::String(_) | Value::Boolean(_) | Value::Regex(_)
            ),
            Self::Numeric => matches!(value, Value::Integer(_) | Value::Float(_)),
            Self::Integer { from, to } => match value {
                Value::Integer(v) => from <= v && v <= to,
                _ => false,
            },
            Self::Float { from, to } => match value {
                Value::Float(v) => from <= v && v <= to,
                _ => false,
            },
            Self::Boolean => matches!(value, Value::Boolean(_)),
            Self::Regexp => matches!(value, Value::Regex(_)),
            Self::Undef => value.is_undef(),
            Self::Default => value.is_default(),
            Self::String { min, max } => match value {
                Value::String(s) => {
                    let length = s.chars().count() as i64;
                    *min <= length && length <= *max
                }
                _ => false,
            },
            Self::Enum(strings) => match value {
                Value::String(s) => strings.iter().any(|candidate| candidate == s),
                _ => false,
            },
            Self::Pattern(patterns) => match value {
                Value::String(s) => patterns.is_empty() || patterns.iter().any(|p| p.pattern().is_match(s)),
                _ => false,
            },
            Self::NotUndef(inner) => {
                !value.is_undef()
                    && match inner {
                        Some(inner) => inner.is_instance(value, guard),
                        None => true,
                    }
            }
            Self::Optional(inner) => {
                value.is_undef()
                    || match inner {
                        Some(inner) => inner.is_instance(value, guard),
                        None => true,
                    }
            }
            Self::Array { element, from, to } => match value {
                Value::Array(elements) => {
                    let length = elements.len() as i64;
                    *from <= length
                        && length <= *to
                        && elements.iter().all(|v| element.is_instance(v, guard))
                }
                _ => false,
            },
            Self::Hash { key, value: value_type, from, to } => match value {
                Value::Hash(hash) => {
                    let length = hash.len() as i64;
                    *from <= length
                        && length <= *to
                        && hash
                            .iter()
                            .all(|(k, v)| key.is_instance(k, guard) && value_type.is_instance(v, guard))
                }
                _ => false,
            },
            Self::Tuple { types, from, to } => match value {
                Value::Array(elements) => {
                    let length = elements.len() as i64;
                    if length < *from || length > *to {
                        return false;
                    }
                    elements.iter().enumerate().all(|(index, element)| {
                        types
                            .get(index)
                            .or_else(|| types.last())
                            .is_some_and(|t| t.is_instance(element, guard))
                    })
                }
                _ => false,
            },
            Self::Struct(members) => match value {
                Value::Hash(hash) => struct_instance(members, hash, guard),
                _ => false,
            },
            Self::Iterable(inner) => iterable_instance(inner.as_deref(), value, guard),
            Self::Iterator(inner) => match value {
                Value::Iterator(iterator) => match inner {
                    Some(inner) => iterable_instance(Some(inner), iterator.source(), guard),
                    None => true,
                },
                _ => false,
            },
            Self::Collection => matches!(value, Value::Array(_) | Value::Hash(_)),
            Self::CatalogEntry | Self::Resource { .. } | Self::Class { .. } => match value {
                Value::Type(t) => self.is_assignable(t, guard),
                _ => false,
            },
            Self::Variant(members) => members.iter().any(|member| member.is_instance(value, guard)),
            Self::Type(inner) => match value {
                Value::Type(t) => match inner {
                    Some(inner) => inner.is_assignable(t, guard),
                    None => true,
                },
                _ => false,
            },
            Self::Data => data_instance(value, guard),
            Self::Callable(_) | Self::Runtime { .. } => false,
            Self::Alias(alias) => match guard.enter(alias, identity_of(value)) {
                Entry::Recursed(stored) => stored,
                Entry::First(key) => {
                    let result = alias.resolved().is_instance(value, guard);
                    guard.store(key, result);
                    result
                }
            },
        }
    }

    /// Widens ranges and recurses into parametric content:
    /// `Integer[3, 5]` generalizes to `Integer`, `Array[String[1], 2, 2]`
    /// to `Array[String]`. Aliases generalize to themselves.
    #[must_use]
    pub fn generalize(&self) -> Self {
        match self {
            Self::Integer { .. } => Self::integer(),
            Self::Float { .. } => Self::float(),
            Self::String { .. } => Self::string(),
            Self::NotUndef(inner) => Self::NotUndef(inner.as_ref().map(|t| Box::new(t.generalize()))),
            Self::Optional(inner) => Self::Optional(inner.as_ref().map(|t| Box::new(t.generalize()))),
            Self::Array { element, .. } => Self::Array {
                element: Box::new(element.generalize()),
                from: 0,
                to: INTEGER_MAX,
            },
            Self::Hash { key, value, .. } => Self::Hash {
                key: Box::new(key.generalize()),
                value: Box::new(value.generalize()),
                from: 0,
                to: INTEGER_MAX,
            },
            Self::Tuple { types, .. } => {
                let types: Vec<Self> = types.iter().map(Self::generalize).collect();
                let len = types.len() as i64;
                Self::Tuple {
                    types,
                    from: len,
                    to: INTEGER_MAX,
                }
            }
            Self::Struct(members) => Self::Struct(
                members
                    .iter()
                    .map(|member| StructMember {
                        key: member.key.clone(),
                        value: member.value.generalize(),
                    })
                    .collect(),
            ),
            Self::Iterable(inner) => Self::Iterable(inner.as_ref().map(|t| Box::new(t.generalize()))),
            Self::Iterator(inner) => Self::Iterator(inner.as_ref().map(|t| Box::new(t.generalize()))),
            Self::Variant(members) => Self::variant(members.iter().map(Self::generalize).collect()),
            Self::Type(inner) => Self::Type(inner.as_ref().map(|t| Box::new(t.generalize()))),
            other => other.clone(),
        }
    }
}

/// Alias assignability, following the original semantics: aliases to the
/// same resolved type are assignable, a variant alias is assignable from
/// an alias resolving to one of its members, and anything else recurses on
/// the resolved type through the guard.
fn alias_assignable(alias: &AliasType, other: &Type, guard: &mut RecursionGuard) -> bool {
    if let Type::Alias(other_alias) = other {
        let target = other_alias.dereferenced_identity();
        if alias.dereferenced_identity() == target {
            return true;
        }
        if let Type::Variant(members) = &*alias.resolved() {
            for member in members {
                if let Type::Alias(member_alias) = member {
                    if member_alias.dereferenced_identity() == target {
                        return true;
                    }
                }
            }
        }
    }
    match guard.enter(alias, identity_of(other)) {
        Entry::Recursed(stored) => stored,
        Entry::First(key) => {
            let result = alias.resolved().is_assignable(other, guard);
            guard.store(key, result);
            result
        }
    }
}

fn struct_assignable(members: &[StructMember], other_members: &[StructMember], guard: &mut RecursionGuard) -> bool {
    // Every required member must be present and assignable; the source may
    // not introduce unknown keys
    for member in members {
        let Some(name) = member.key_name() else {
            return false;
        };
        match other_members.iter().find(|m| m.key_name() == Some(name)) {
            Some(other_member) => {
                if !member.value.is_assignable(&other_member.value, guard) {
                    return false;
                }
            }
            None => {
                if !member.is_optional() && !member.value.is_assignable(&Type::Undef, guard) {
                    return false;
                }
            }
        }
    }
    other_members
        .iter()
        .all(|other_member| members.iter().any(|m| m.key_name() == other_member.key_name()))
}

fn struct_instance(members: &[StructMember], hash: &crate::value::ValueHash, guard: &mut RecursionGuard) -> bool {
    for member in members {
        let Some(name) = member.key_name() else {
            return false;
        };
        match hash.get(&Value::string(name)) {
            Some(value) => {
                if !member.value.is_instance(value, guard) {
                    return false;
                }
            }
            None => {
                if !member.is_optional() && !member.value.is_instance(&Value::Undef, guard) {
                    return false;
                }
            }
        }
    }
    // No unknown keys
    hash.keys().all(|key| {
        key.as_string()
            .is_some_and(|name| members.iter().any(|m| m.key_name() == Some(name)))
    })
}

/// The element type iteration over a type's instances yields, if the type
/// is iterable at all.
fn iterable_element(other: &Type) -> Option<Type> {
    match other {
        Type::Array { element, .. } => Some((**element).clone()),
        Type::Hash { key, value, .. } => Some(Type::Tuple {
            types: vec![(**key).clone(), (**value).clone()],
            from: 2,
            to: 2,
        }),
        Type::Tuple { types, .. } => Some(Type::variant(types.clone())),
        Type::String { .. } | Type::Enum(_) => Some(Type::string()),
        Type::Integer { from, to } => Some(Type::Integer { from: *from, to: *to }),
        Type::Iterator(inner) | Type::Iterable(inner) => {
            Some(inner.as_deref().cloned().unwrap_or(Type::Any))
        }
        _ => None,
    }
}

fn iterable_instance(inner: Option<&Type>, value: &Value, guard: &mut RecursionGuard) -> bool {
    if !iterator::is_iterable(value) {
        return false;
    }
    let Some(inner) = inner else {
        return true;
    };
    match value {
        Value::Array(elements) => elements.iter().all(|v| inner.is_instance(v, guard)),
        Value::Hash(hash) => hash.iter().all(|(k, v)| {
            inner.is_instance(&Value::array(vec![k.clone(), v.clone()]), guard)
        }),
        Value::String(_) => inner.is_assignable(&Type::string(), guard),
        Value::Integer(_) => inner.is_assignable(&Type::integer(), guard),
        Value::Iterator(it) => iterable_instance(Some(inner), it.source(), guard),
        _ => false,
    }
}

fn data_assignable(other: &Type, guard: &mut RecursionGuard) -> bool {
    match other {
        Type::Data
        | Type::Undef
        | Type::Boolean
        | Type::Integer { .. }
        | Type::Float { .. }
        | Type::String { .. }
        | Type::Enum(_)
        | Type::Pattern(_) => true,
        Type::Array { element, .. } => data_assignable(element, guard),
        Type::Hash { key, value, .. } => {
            Type::Scalar.is_assignable(key, guard) && data_assignable(value, guard)
        }
        Type::Tuple { types, .. } => types.iter().all(|t| data_assignable(t, guard)),
        Type::Struct(members) => members.iter().all(|m| data_assignable(&m.value, guard)),
        Type::Variant(members) => members.iter().all(|t| data_assignable(t, guard)),
        Type::Optional(inner) | Type::NotUndef(inner) => {
            inner.as_deref().is_none_or(|t| data_assignable(t, guard))
        }
        _ => false,
    }
}

fn data_instance(value: &Value, guard: &mut RecursionGuard) -> bool {
    match value {
        Value::Undef | Value::Boolean(_) | Value::Integer(_) | Value::Float(_) | Value::String(_) => true,
        Value::Array(elements) => elements.iter().all(|v| data_instance(v, guard)),
        Value::Hash(hash) => hash
            .iter()
            .all(|(k, v)| Type::Scalar.is_instance(k, guard) && data_instance(v, guard)),
        _ => false,
    }
}

/// Callable-to-callable assignability: the source must accept every call
/// shape the target describes (contravariant parameters).
fn callable_assignable(target: &CallableType, source: &CallableType, guard: &mut RecursionGuard) -> bool {
    if target.params.is_empty() && target.block.is_none() {
        return true;
    }
    if source.min > target.min || source.max < target.max {
        return false;
    }
    for (index, param) in target.params.iter().enumerate() {
        let source_param = source.params.get(index).or_else(|| source.params.last());
        if let Some(source_param) = source_param {
            if !source_param.is_assignable(param, guard) {
                return false;
            }
        }
    }
    match (&target.block, &source.block) {
        (None, None) => true,
        (None, Some(_)) => !source.block_required,
        (Some(_), None) => !target.block_required,
        (Some(target_block), Some(source_block)) => target_block.is_assignable(source_block, guard),
    }
}

/// True when the type admits `undef` among its instances.
fn accepts_undef(t: &Type) -> bool {
    match t {
        Type::Undef | Type::Any | Type::Optional(_) | Type::Data => true,
        Type::Variant(members) => members.iter().any(accepts_undef),
        _ => false,
    }
}

/// Infers a precise element type for a collection literal: the
/// generalized variant of the element types.
#[must_use]
pub fn infer_element_type(values: &[Value]) -> Type {
    if values.is_empty() {
        return Type::Any;
    }
    let mut types: Vec<Type> = Vec::new();
    for value in values {
        let inferred = type_of(value).generalize();
        if !types.contains(&inferred) {
            types.push(inferred);
        }
    }
    if types.len() == 1 {
        types.pop().expect("one element")
    } else {
        Type::variant(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_range_instance() {
        let t = Type::Integer { from: 3, to: 5 };
        assert!(t.instance_of(&Value::Integer(3)));
        assert!(t.instance_of(&Value::Integer(5)));
        assert!(!t.instance_of(&Value::Integer(6)));
        assert!(!t.instance_of(&Value::Float(4.0)));
        assert_eq!(t.generalize(), Type::integer());
    }

    #[test]
    fn integer_range_assignability() {
        let wide = Type::Integer { from: 0, to: 100 };
        let narrow = Type::Integer { from: 10, to: 20 };
        assert!(wide.assignable_from(&narrow));
        assert!(!narrow.assignable_from(&wide));
    }

    #[test]
    fn optional_accepts_undef() {
        let t = Type::Optional(Some(Box::new(Type::string())));
        assert!(t.instance_of(&Value::Undef));
        assert!(t.instance_of(&Value::string("x")));
        assert!(!t.instance_of(&Value::Integer(1)));
    }

    #[test]
    fn tuple_instance_with_variadic_tail() {
        let t = Type::Tuple {
            types: vec![Type::string(), Type::integer()],
            from: 2,
            to: 4,
        };
        let value = Value::array(vec![
            Value::string("a"),
            Value::Integer(1),
            Value::Integer(2),
        ]);
        assert!(t.instance_of(&value));
    }

    #[test]
    fn variant_assignable_from_member() {
        let v = Type::variant(vec![Type::integer(), Type::string()]);
        assert!(v.assignable_from(&Type::integer()));
        assert!(v.instance_of(&Value::string("x")));
        assert!(!v.instance_of(&Value::Boolean(true)));
    }

    #[test]
    fn recursive_alias_terminates_and_is_self_assignable() {
        // type Tree = Variant[Integer, Hash[String, Tree]]
        let alias = AliasType::new("Tree");
        alias.resolve(Type::variant(vec![
            Type::integer(),
            Type::Hash {
                key: Box::new(Type::string()),
                value: Box::new(Type::Alias(alias.clone())),
                from: 0,
                to: INTEGER_MAX,
            },
        ]));
        let t = Type::Alias(alias);
        assert!(t.assignable_from(&t));

        let mut inner = crate::value::ValueHash::default();
        inner.insert(Value::string("leaf"), Value::Integer(1));
        let mut outer = crate::value::ValueHash::default();
        outer.insert(Value::string("node"), Value::hash(inner));
        assert!(t.instance_of(&Value::hash(outer)));
        assert!(!t.instance_of(&Value::Boolean(true)));
    }

    #[test]
    fn struct_membership() {
        let t = Type::Struct(vec![
            StructMember {
                key: Type::Enum(vec!["mode".to_owned()]),
                value: Type::string(),
            },
            StructMember {
                key: Type::Optional(Some(Box::new(Type::Enum(vec!["owner".to_owned()])))),
                value: Type::string(),
            },
        ]);
        let mut hash = crate::value::ValueHash::default();
        hash.insert(Value::string("mode"), Value::string("0644"));
        assert!(t.instance_of(&Value::hash(hash.clone())));
        hash.insert(Value::string("extra"), Value::string("x"));
        assert!(!t.instance_of(&Value::hash(hash)));
    }

    #[test]
    fn data_excludes_regex() {
        assert!(Type::Data.instance_of(&Value::Integer(1)));
        assert!(!Type::Data.instance_of(&Value::Regex(crate::value::ValueRegex::new("x").unwrap())));
    }

    #[test]
    fn resource_reference_instance() {
        let entry = Type::CatalogEntry;
        let reference = Value::Type(Type::resource("notify", "a"));
        assert!(entry.instance_of(&reference));
        let specific = Type::Resource {
            type_name: Some("Notify".to_owned()),
            title: None,
        };
        assert!(specific.instance_of(&reference));
    }
}
