//! Access-expression evaluation: `target[args]` over values and types.
//!
//! Arrays and strings index by position (negative counts from the end,
//! out of range is `undef`) or slice by `[start, count]`; hashes select
//! values by key; types parameterize through [`type_parse::parameterize`],
//! with resource and class references fanning out over multiple titles.

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::Context;
use crate::lexer::position::Span;
use crate::types::{Type, convert, parse as type_parse, type_of};
use crate::value::Value;

pub fn evaluate_access(
    _context: &mut Context<'_>,
    target: Value,
    args: Vec<Value>,
    target_span: Span,
    span: Span,
) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvaluationError::new("expected at least one access argument", span));
    }
    match target {
        Value::Array(elements) => access_list(&elements, &args, span, |element| element.clone()),
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            access_list(&chars, &args, span, |c| Value::String(c.to_string()))
        }
        Value::Hash(hash) => {
            if args.len() == 1 {
                return Ok(hash.get(&args[0]).cloned().unwrap_or(Value::Undef));
            }
            let values: Vec<Value> = args.iter().filter_map(|key| hash.get(key).cloned()).collect();
            Ok(Value::array(values))
        }
        Value::Type(t) => access_type(&t, &args, span),
        other => Err(EvaluationError::new(
            format!(
                "access expressions are not supported for a value of type {}",
                type_of(&other).generalize()
            ),
            target_span,
        )),
    }
}

/// Shared index/slice logic for arrays and strings.
fn access_list<T>(elements: &[T], args: &[Value], span: Span, project: impl Fn(&T) -> Value) -> EvalResult<Value> {
    let index = match &args[0] {
        Value::Integer(index) => *index,
        other => {
            return Err(EvaluationError::new(
                format!(
                    "expected Integer for access index but found {}",
                    type_of(other).generalize()
                ),
                span,
            ));
        }
    };
    let start = if index < 0 {
        let wrapped = elements.len() as i64 + index;
        if wrapped < 0 { 0 } else { wrapped as usize }
    } else {
        index as usize
    };

    match args.len() {
        1 => Ok(elements.get(start).map_or(Value::Undef, &project)),
        2 => {
            let count = match &args[1] {
                Value::Integer(count) => *count,
                other => {
                    return Err(EvaluationError::new(
                        format!(
                            "expected Integer for access count but found {}",
                            type_of(other).generalize()
                        ),
                        span,
                    ));
                }
            };
            if count < 0 || start >= elements.len() {
                return Ok(Value::array(Vec::new()));
            }
            let end = (start + count as usize).min(elements.len());
            Ok(Value::array(elements[start..end].iter().map(project).collect()))
        }
        _ => Err(EvaluationError::new(
            "expected at most two access arguments",
            span,
        )),
    }
}

/// Parameterizes a type, fanning out resource and class references over
/// multiple titles.
fn access_type(target: &Type, args: &[Value], span: Span) -> EvalResult<Value> {
    let error = |message: String| EvaluationError::new(message, span);

    match target {
        // Notify['a', 'b'] makes an array of references
        Type::Resource {
            type_name: Some(_),
            title: None,
        } if args.len() > 1 => {
            let references = args
                .iter()
                .map(|title| type_parse::parameterize(target, std::slice::from_ref(title)).map(Value::Type))
                .collect::<Result<Vec<_>, _>>()
                .map_err(error)?;
            Ok(Value::array(references))
        }
        Type::Class { title: None } if args.len() > 1 => {
            let references = args
                .iter()
                .map(|title| type_parse::parameterize(target, std::slice::from_ref(title)).map(Value::Type))
                .collect::<Result<Vec<_>, _>>()
                .map_err(error)?;
            Ok(Value::array(references))
        }
        // Resource[Notify, 'a', 'b'] likewise
        Type::Resource { type_name: None, .. } if args.len() > 2 => {
            let references = args[1..]
                .iter()
                .map(|title| {
                    type_parse::parameterize(target, &[args[0].clone(), title.clone()]).map(Value::Type)
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(error)?;
            Ok(Value::array(references))
        }
        _ => type_parse::parameterize(target, args).map(Value::Type).map_err(error),
    }
}

/// `Type.new(...)` conversions: the string-to-numeric rules for Integer
/// and Float, stringification for String, and common truthy forms for
/// Boolean. The converted value must satisfy the target type's bounds.
pub fn new_instance(target: &Type, args: &[Value], span: Span) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvaluationError::new("expected at least one argument for 'new'", span));
    }
    let value = &args[0];
    let converted = match target {
        Type::Integer { .. } => match (value, args.get(1)) {
            (Value::String(text), Some(Value::Integer(radix))) => {
                let radix = u32::try_from(*radix)
                    .ok()
                    .filter(|radix| matches!(radix, 2 | 8 | 10 | 16))
                    .ok_or_else(|| EvaluationError::new("radix must be 2, 8, 10, or 16", span))?;
                Value::Integer(
                    convert::integer_from_string(text, radix)
                        .map_err(|e| EvaluationError::new(e.to_string(), span))?,
                )
            }
            _ => Value::Integer(convert::to_integer(value).map_err(|e| EvaluationError::new(e.to_string(), span))?),
        },
        Type::Float { .. } => {
            Value::Float(convert::to_float(value).map_err(|e| EvaluationError::new(e.to_string(), span))?)
        }
        Type::String { .. } => Value::string(value.to_string()),
        Type::Boolean => match value {
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Integer(v) => Value::Boolean(*v != 0),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" => Value::Boolean(true),
                "false" | "no" | "n" => Value::Boolean(false),
                _ => {
                    return Err(EvaluationError::new(
                        format!("string '{s}' cannot be converted to Boolean"),
                        span,
                    ));
                }
            },
            other => {
                return Err(EvaluationError::new(
                    format!(
                        "cannot convert a value of type {} to Boolean",
                        type_of(other).generalize()
                    ),
                    span,
                ));
            }
        },
        Type::Array { .. } => Value::array(value.clone().into_elements(true)),
        other => {
            return Err(EvaluationError::new(
                format!("cannot create an instance of type {other}"),
                span,
            ));
        }
    };

    if !target.instance_of(&converted) {
        return Err(EvaluationError::new(
            format!("the converted value {converted} is not an instance of {target}"),
            span,
        ));
    }
    Ok(converted)
}
