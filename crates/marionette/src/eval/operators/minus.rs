//! The subtraction operator.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::plus::as_float;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::{INTEGER_MAX, Type};
use crate::value::{Value, ValueHash};

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::Minus);
    descriptor.add(Type::Numeric, Type::Numeric, numeric_subtract);
    descriptor.add(any_array(), Type::Any, array_subtract);
    descriptor.add(
        any_hash(),
        Type::variant(vec![any_hash(), any_array()]),
        hash_subtract,
    );
    descriptor
}

fn any_array() -> Type {
    Type::Array {
        element: Box::new(Type::Any),
        from: 0,
        to: INTEGER_MAX,
    }
}

fn any_hash() -> Type {
    Type::Hash {
        key: Box::new(Type::Any),
        value: Box::new(Type::Any),
        from: 0,
        to: INTEGER_MAX,
    }
}

fn numeric_subtract(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    match (&operands.left, &operands.right) {
        (Value::Integer(left), Value::Integer(right)) => match left.checked_sub(*right) {
            Some(difference) => Ok(Value::Integer(difference)),
            None => Err(operands.error(format!(
                "subtraction of {right} from {left} results in an arithmetic underflow"
            ))),
        },
        (left, right) => {
            let left = as_float(left);
            let right = as_float(right);
            let difference = left - right;
            if difference.is_finite() || left.is_infinite() || right.is_infinite() {
                Ok(Value::Float(difference))
            } else {
                Err(operands.error(format!(
                    "subtraction of {right} from {left} results in an arithmetic underflow"
                )))
            }
        }
    }
}

/// Array difference: an array operand removes equal elements, a hash
/// operand removes `[key, value]` pair elements, anything else removes
/// elements equal to it.
fn array_subtract(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let elements = operands.left.into_elements(false);
    let retained = match &operands.right {
        Value::Array(removals) => elements
            .into_iter()
            .filter(|element| !removals.iter().any(|removal| removal.equals(element)))
            .collect(),
        Value::Hash(hash) => elements
            .into_iter()
            .filter(|element| {
                let Some(pair) = element.as_array() else {
                    return true;
                };
                if pair.len() != 2 {
                    return true;
                }
                !hash.get(&pair[0]).is_some_and(|value| value.equals(&pair[1]))
            })
            .collect(),
        other => elements
            .into_iter()
            .filter(|element| !element.equals(other))
            .collect(),
    };
    Ok(Value::array(retained))
}

/// Hash difference: a hash operand removes its keys, an array operand
/// removes the listed keys.
fn hash_subtract(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let Value::Hash(left) = &operands.left else {
        unreachable!("guarded by the overload types");
    };
    let mut retained: ValueHash = left.as_ref().clone();
    match &operands.right {
        Value::Hash(removals) => {
            for key in removals.keys() {
                retained.shift_remove(key);
            }
        }
        Value::Array(keys) => {
            for key in keys.iter() {
                retained.shift_remove(key);
            }
        }
        _ => unreachable!("guarded by the overload types"),
    }
    Ok(Value::hash(retained))
}
