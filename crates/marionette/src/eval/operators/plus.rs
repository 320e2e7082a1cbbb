//! The addition operator.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::{INTEGER_MAX, Type};
use crate::value::{Value, ValueHash};

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::Plus);
    descriptor.add(Type::Numeric, Type::Numeric, numeric_add);
    descriptor.add(array_type(), Type::Any, array_add);
    descriptor.add(
        Type::Hash {
            key: Box::new(Type::Any),
            value: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        Type::variant(vec![
            Type::Hash {
                key: Box::new(Type::Any),
                value: Box::new(Type::Any),
                from: 0,
                to: INTEGER_MAX,
            },
            array_type(),
        ]),
        hash_add,
    );
    descriptor
}

fn array_type() -> Type {
    Type::Array {
        element: Box::new(Type::Any),
        from: 0,
        to: INTEGER_MAX,
    }
}

/// Numeric addition with explicit overflow checks: integers compare
/// against the limits before adding, floats are inspected for a finite
/// result.
fn numeric_add(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    match (&operands.left, &operands.right) {
        (Value::Integer(left), Value::Integer(right)) => match left.checked_add(*right) {
            Some(sum) => Ok(Value::Integer(sum)),
            None => Err(operands.error(format!(
                "addition of {left} and {right} results in an arithmetic overflow"
            ))),
        },
        (left, right) => {
            let left = as_float(left);
            let right = as_float(right);
            let sum = left + right;
            if sum.is_finite() || left.is_infinite() || right.is_infinite() {
                Ok(Value::Float(sum))
            } else {
                Err(operands.error(format!(
                    "addition of {left} and {right} results in an arithmetic overflow"
                )))
            }
        }
    }
}

pub(super) fn as_float(value: &Value) -> f64 {
    match value {
        Value::Integer(v) => *v as f64,
        Value::Float(v) => *v,
        _ => f64::NAN,
    }
}

/// Array concatenation: an array operand concatenates, a hash appends its
/// `[key, value]` pairs, anything else appends as a single element.
fn array_add(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let mut elements = operands.left.into_elements(false);
    match operands.right {
        Value::Array(right) => elements.extend(right.iter().cloned()),
        Value::Hash(right) => {
            for (key, value) in right.iter() {
                elements.push(Value::array(vec![key.clone(), value.clone()]));
            }
        }
        other => elements.push(other),
    }
    Ok(Value::array(elements))
}

/// Hash merge: a hash operand overrides key-by-key; an array operand is
/// either a list of `[key, value]` pairs or an even-length flat list.
fn hash_add(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let Value::Hash(left) = &operands.left else {
        unreachable!("guarded by the overload types");
    };
    let mut merged: ValueHash = left.as_ref().clone();
    match &operands.right {
        Value::Hash(right) => {
            for (key, value) in right.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        Value::Array(elements) => {
            let all_pairs = !elements.is_empty()
                && elements
                    .iter()
                    .all(|element| element.as_array().is_some_and(|pair| pair.len() == 2));
            if all_pairs {
                for element in elements.iter() {
                    let pair = element.as_array().expect("checked above");
                    merged.insert(pair[0].clone(), pair[1].clone());
                }
            } else {
                if elements.len() % 2 != 0 {
                    return Err(operands.error(
                        "expected an even number of elements when merging an array into a hash",
                    ));
                }
                for pair in elements.chunks(2) {
                    merged.insert(pair[0].clone(), pair[1].clone());
                }
            }
        }
        _ => unreachable!("guarded by the overload types"),
    }
    Ok(Value::hash(merged))
}
