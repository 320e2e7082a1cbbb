//! Building types from syntax.
//!
//! `Array[String, 1, 10]` parses as a postfix access over a type-named
//! primary; this module evaluates that restricted expression shape into a
//! [`Type`] without needing a full evaluation context. The same
//! parameterization rules back access expressions on type values at
//! runtime.

use crate::ast::{Expr, ExprLoc, StringPart};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{
    AliasType, CallableType, INTEGER_MAX, INTEGER_MIN, StructMember, Type, normalize_type_name,
};
use crate::value::{Value, ValueHash, ValueRegex};

/// Alias lookup used while building types. The evaluation context supplies
/// one backed by the registry; signature parsing uses [`no_aliases`].
pub type AliasResolver<'a> = &'a dyn Fn(&str) -> Option<AliasType>;

/// A resolver for contexts with no alias definitions.
#[must_use]
pub fn no_aliases() -> impl Fn(&str) -> Option<AliasType> {
    |_: &str| None
}

/// Resolves a bare type name: a built-in lattice name, a registered alias,
/// or (for anything unknown) a resource type reference.
pub fn base_type(name: &str, resolver: AliasResolver<'_>) -> Type {
    match name {
        "Any" => Type::Any,
        "Scalar" => Type::Scalar,
        "Numeric" => Type::Numeric,
        "Integer" => Type::integer(),
        "Float" => Type::float(),
        "Boolean" => Type::Boolean,
        "String" => Type::string(),
        "Enum" => Type::Enum(Vec::new()),
        "Pattern" => Type::Pattern(Vec::new()),
        "Regexp" => Type::Regexp,
        "Undef" => Type::Undef,
        "Default" => Type::Default,
        "NotUndef" => Type::NotUndef(None),
        "Optional" => Type::Optional(None),
        "Array" => Type::Array {
            element: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        "Hash" => Type::Hash {
            key: Box::new(Type::Any),
            value: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        "Tuple" => Type::Tuple {
            types: Vec::new(),
            from: 0,
            to: INTEGER_MAX,
        },
        "Struct" => Type::Struct(Vec::new()),
        "Iterable" => Type::Iterable(None),
        "Iterator" => Type::Iterator(None),
        "Collection" => Type::Collection,
        "CatalogEntry" => Type::CatalogEntry,
        "Resource" => Type::Resource {
            type_name: None,
            title: None,
        },
        "Class" => Type::Class { title: None },
        "Variant" => Type::Variant(Vec::new()),
        "Type" => Type::Type(None),
        "Data" => Type::Data,
        "Callable" => Type::Callable(CallableType::any()),
        "Runtime" => Type::Runtime {
            runtime: None,
            type_name: None,
        },
        other => match resolver(other) {
            Some(alias) => Type::Alias(alias),
            None => Type::Resource {
                type_name: Some(normalize_type_name(other)),
                title: None,
            },
        },
    }
}

/// Applies access arguments to a base type: `Integer[1, 10]`,
/// `Array[String, 2]`, `Notify['a']`, and so on.
///
/// Multi-title resource and class references (`Notify['a', 'b']`) are
/// handled by the access evaluator, which calls this once per title.
pub fn parameterize(base: &Type, args: &[Value]) -> Result<Type, String> {
    if args.is_empty() {
        return Err(format!("expected at least one parameter for {base}"));
    }
    match base {
        Type::Integer { .. } => {
            let (from, to) = integer_range(args)?;
            Ok(Type::Integer { from, to })
        }
        Type::Float { .. } => {
            let (from, to) = float_range(args)?;
            Ok(Type::Float { from, to })
        }
        Type::String { .. } => {
            let (min, max) = integer_range(args)?;
            Ok(Type::String {
                min: min.max(0),
                max,
            })
        }
        Type::Enum(_) => {
            let mut strings = Vec::with_capacity(args.len());
            for arg in args {
                match arg.as_string() {
                    Some(s) => strings.push(s.to_owned()),
                    None => return Err(format!("expected String for Enum parameter but found {arg}")),
                }
            }
            Ok(Type::Enum(strings))
        }
        Type::Pattern(_) => {
            let mut patterns = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Value::Regex(regex) => patterns.push(regex.clone()),
                    Value::String(s) => patterns.push(ValueRegex::new(s.clone())?),
                    other => {
                        return Err(format!("expected Regexp or String for Pattern parameter but found {other}"));
                    }
                }
            }
            Ok(Type::Pattern(patterns))
        }
        Type::Regexp => match args {
            [Value::String(s)] => {
                ValueRegex::new(s.clone())?;
                Ok(Type::Regexp)
            }
            _ => Err("expected a single String parameter for Regexp".to_owned()),
        },
        Type::NotUndef(_) => Ok(Type::NotUndef(Some(Box::new(single_wrapped(args, "NotUndef")?)))),
        Type::Optional(_) => Ok(Type::Optional(Some(Box::new(single_wrapped(args, "Optional")?)))),
        Type::Array { .. } => {
            let element = match &args[0] {
                Value::Type(t) => t.clone(),
                Value::Default => Type::Any,
                other => return Err(format!("expected Type for Array parameter but found {other}")),
            };
            let (from, to) = if args.len() > 1 {
                integer_range(&args[1..])?
            } else {
                (0, INTEGER_MAX)
            };
            Ok(Type::Array {
                element: Box::new(element),
                from: from.max(0),
                to,
            })
        }
        Type::Hash { .. } => {
            if args.len() < 2 {
                return Err("expected at least two parameters for Hash".to_owned());
            }
            let key = type_argument(&args[0], "Hash")?;
            let value = type_argument(&args[1], "Hash")?;
            let (from, to) = if args.len() > 2 {
                integer_range(&args[2..])?
            } else {
                (0, INTEGER_MAX)
            };
            Ok(Type::Hash {
                key: Box::new(key),
                value: Box::new(value),
                from: from.max(0),
                to,
            })
        }
        Type::Tuple { .. } => {
            // Trailing integers (or default) form the size range
            let mut types = Vec::new();
            let mut index = 0;
            while index < args.len() {
                match &args[index] {
                    Value::Type(t) => types.push(t.clone()),
                    _ => break,
                }
                index += 1;
            }
            if types.is_empty() {
                return Err("expected at least one Type parameter for Tuple".to_owned());
            }
            let (from, to) = if index < args.len() {
                let (from, to) = integer_range(&args[index..])?;
                (from.max(0), to)
            } else {
                (types.len() as i64, types.len() as i64)
            };
            Ok(Type::Tuple { types, from, to })
        }
        Type::Struct(_) => match args {
            [Value::Hash(schema)] => {
                let mut members = Vec::with_capacity(schema.len());
                for (key, value) in schema.iter() {
                    let value = type_argument(value, "Struct")?;
                    let key = match key {
                        Value::String(name) => Type::Enum(vec![name.clone()]),
                        Value::Type(t) => t.clone(),
                        other => return Err(format!("expected String or Type for Struct key but found {other}")),
                    };
                    members.push(StructMember { key, value });
                }
                Ok(Type::Struct(members))
            }
            _ => Err("expected a single Hash parameter for Struct".to_owned()),
        },
        Type::Variant(_) => {
            let mut members = Vec::with_capacity(args.len());
            for arg in args {
                members.push(type_argument(arg, "Variant")?);
            }
            Ok(Type::variant(members))
        }
        Type::Type(_) => Ok(Type::Type(Some(Box::new(single_wrapped(args, "Type")?)))),
        Type::Iterable(_) => Ok(Type::Iterable(Some(Box::new(single_wrapped(args, "Iterable")?)))),
        Type::Iterator(_) => Ok(Type::Iterator(Some(Box::new(single_wrapped(args, "Iterator")?)))),
        Type::Callable(_) => {
            let mut params = Vec::new();
            let mut index = 0;
            while index < args.len() {
                match &args[index] {
                    Value::Type(t) => params.push(t.clone()),
                    _ => break,
                }
                index += 1;
            }
            let (min, max) = if index < args.len() {
                let (from, to) = integer_range(&args[index..])?;
                (
                    usize::try_from(from.max(0)).unwrap_or(0),
                    usize::try_from(to).unwrap_or(usize::MAX),
                )
            } else {
                (params.len(), params.len())
            };
            Ok(Type::Callable(CallableType {
                params,
                min,
                max,
                block: None,
                block_required: false,
            }))
        }
        Type::Runtime { .. } => {
            let runtime = match args.first().and_then(Value::as_string) {
                Some(s) => s.to_owned(),
                None => return Err("expected String for Runtime parameter".to_owned()),
            };
            let type_name = args.get(1).and_then(Value::as_string).map(str::to_owned);
            Ok(Type::Runtime {
                runtime: Some(runtime),
                type_name,
            })
        }
        Type::Resource { type_name: None, .. } => {
            // Resource[Notify] or Resource[Notify, 'title']
            let type_name = match &args[0] {
                Value::String(s) => normalize_type_name(s),
                Value::Type(Type::Resource {
                    type_name: Some(name),
                    title: None,
                }) => name.clone(),
                other => return Err(format!("expected a resource type for Resource parameter but found {other}")),
            };
            let title = match args.get(1) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => return Err(format!("expected String for Resource title but found {other}")),
                None => None,
            };
            Ok(Type::Resource {
                type_name: Some(type_name),
                title,
            })
        }
        Type::Resource {
            type_name: Some(name),
            title: None,
        } => match args {
            [Value::String(title)] => Ok(Type::Resource {
                type_name: Some(name.clone()),
                title: Some(title.clone()),
            }),
            _ => Err(format!("expected a single String title for {name}")),
        },
        Type::Class { title: None } => match args {
            [Value::String(title)] => Ok(Type::class(title)),
            [Value::Type(Type::Class { title: Some(title) })] => Ok(Type::Class {
                title: Some(title.clone()),
            }),
            _ => Err("expected a single String parameter for Class".to_owned()),
        },
        other => Err(format!("type {other} cannot be parameterized")),
    }
}

fn type_argument(value: &Value, context: &str) -> Result<Type, String> {
    match value {
        Value::Type(t) => Ok(t.clone()),
        Value::Default => Ok(Type::Any),
        other => Err(format!("expected Type for {context} parameter but found {other}")),
    }
}

fn single_wrapped(args: &[Value], context: &str) -> Result<Type, String> {
    match args {
        [Value::Type(t)] => Ok(t.clone()),
        [Value::String(s)] => Ok(Type::Enum(vec![s.clone()])),
        _ => Err(format!("expected a single Type parameter for {context}")),
    }
}

/// An integer range from access arguments, `default` standing for the
/// extreme limit on either side. Bounds are normalized so `from <= to`.
fn integer_range(args: &[Value]) -> Result<(i64, i64), String> {
    if args.len() > 2 {
        return Err("expected at most two range parameters".to_owned());
    }
    let bound = |value: &Value, unbounded: i64| -> Result<i64, String> {
        match value {
            Value::Integer(v) => Ok(*v),
            Value::Default => Ok(unbounded),
            other => Err(format!("expected Integer or default for range parameter but found {other}")),
        }
    };
    let from = bound(&args[0], INTEGER_MIN)?;
    let to = match args.get(1) {
        Some(value) => bound(value, INTEGER_MAX)?,
        None => INTEGER_MAX,
    };
    Ok(if from <= to { (from, to) } else { (to, from) })
}

fn float_range(args: &[Value]) -> Result<(f64, f64), String> {
    if args.len() > 2 {
        return Err("expected at most two range parameters".to_owned());
    }
    let bound = |value: &Value, unbounded: f64| -> Result<f64, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            Value::Default => Ok(unbounded),
            other => Err(format!("expected Float or default for range parameter but found {other}")),
        }
    };
    let from = bound(&args[0], f64::NEG_INFINITY)?;
    let to = match args.get(1) {
        Some(value) => bound(value, f64::INFINITY)?,
        None => f64::INFINITY,
    };
    Ok(if from <= to { (from, to) } else { (to, from) })
}

/// Evaluates a type-position expression (already vetted by the parser's
/// type-position walk) into a type, without a full evaluation context.
pub fn type_from_expression(expr: &ExprLoc, resolver: AliasResolver<'_>) -> EvalResult<Type> {
    match literal_value(expr, resolver)? {
        Value::Type(t) => Ok(t),
        other => Err(EvaluationError::new(
            format!("expected a type but found a value of type {}", crate::types::type_of(&other)),
            expr.span,
        )),
    }
}

/// Evaluates the literal subset of expressions allowed in type positions.
fn literal_value(expr: &ExprLoc, resolver: AliasResolver<'_>) -> EvalResult<Value> {
    let error = |message: String| EvaluationError::new(message, expr.span);
    match &expr.expr {
        Expr::Undef => Ok(Value::Undef),
        Expr::Default => Ok(Value::Default),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Integer(v) => Ok(Value::Integer(*v)),
        Expr::Float(v) => Ok(Value::Float(*v)),
        Expr::String(s) => Ok(Value::string(s.clone())),
        Expr::InterpolatedString(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    StringPart::Literal(s) => text.push_str(s),
                    StringPart::Expression(_) => {
                        return Err(error("interpolation is not allowed in a type specification".to_owned()));
                    }
                }
            }
            Ok(Value::string(text))
        }
        Expr::Regex(pattern) => Ok(Value::Regex(ValueRegex::new(pattern.clone()).map_err(error)?)),
        Expr::Name(name) | Expr::BareWord(name) => Ok(Value::string(name.clone())),
        Expr::TypeName(name) => Ok(Value::Type(base_type(name, resolver))),
        Expr::Negate(operand) => match literal_value(operand, resolver)? {
            Value::Integer(v) => Ok(Value::Integer(-v)),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(error(format!("cannot negate a value of type {}", crate::types::type_of(&other)))),
        },
        Expr::Array(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(literal_value(element, resolver)?);
            }
            Ok(Value::array(values))
        }
        Expr::Hash(pairs) => {
            let mut hash = ValueHash::with_capacity(pairs.len());
            for (key, value) in pairs {
                hash.insert(literal_value(key, resolver)?, literal_value(value, resolver)?);
            }
            Ok(Value::hash(hash))
        }
        Expr::Access(access) => {
            let base = match literal_value(&access.target, resolver)? {
                Value::Type(t) => t,
                other => {
                    return Err(error(format!(
                        "a value of type {} cannot be parameterized",
                        crate::types::type_of(&other)
                    )));
                }
            };
            let mut args = Vec::with_capacity(access.args.len());
            for arg in &access.args {
                args.push(literal_value(arg, resolver)?);
            }
            parameterize(&base, &args).map(Value::Type).map_err(error)
        }
        _ => Err(error("unexpected expression in type specification".to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_type(source: &str) -> Type {
        let output = crate::parser::parse(&format!("type X = {source}"), "test.pp").unwrap();
        let crate::ast::Statement::TypeAlias(alias) = &output.tree.statements[0] else {
            panic!("expected type alias");
        };
        let none = no_aliases();
        type_from_expression(&alias.aliased, &none).unwrap()
    }

    #[test]
    fn parses_parameterized_types() {
        assert_eq!(parse_type("Integer[3, 5]"), Type::Integer { from: 3, to: 5 });
        assert_eq!(
            parse_type("Array[String, 1, 10]"),
            Type::Array {
                element: Box::new(Type::string()),
                from: 1,
                to: 10,
            }
        );
        assert_eq!(
            parse_type("Optional[Integer]"),
            Type::Optional(Some(Box::new(Type::integer())))
        );
    }

    #[test]
    fn range_bounds_normalize() {
        assert_eq!(parse_type("Integer[5, 3]"), Type::Integer { from: 3, to: 5 });
        assert_eq!(
            parse_type("Integer[default, 5]"),
            Type::Integer {
                from: INTEGER_MIN,
                to: 5
            }
        );
    }

    #[test]
    fn unknown_type_name_is_a_resource_reference() {
        assert_eq!(
            parse_type("Notify['a']"),
            Type::resource("notify", "a")
        );
    }

    #[test]
    fn struct_schema_from_hash() {
        let t = parse_type("Struct[{'mode' => String, Optional['owner'] => String}]");
        let Type::Struct(members) = t else {
            panic!("expected struct");
        };
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].key_name(), Some("mode"));
        assert!(!members[0].is_optional());
        assert!(members[1].is_optional());
    }

    #[test]
    fn variant_of_strings() {
        let t = parse_type("Variant[Integer, String]");
        assert_eq!(t, Type::variant(vec![Type::integer(), Type::string()]));
    }
}
