//! The ordering operators.
//!
//! Numbers order numerically across integer/float; strings order
//! case-insensitively; types order by assignability (`Integer < Numeric`
//! holds because `Numeric` is the more general type).

use std::cmp::Ordering;

use crate::ast::BinaryOp;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::Context;
use crate::eval::operators::plus::as_float;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptors() -> Vec<BinaryDescriptor> {
    vec![
        descriptor(BinaryOp::Less, |context, operands| {
            compare(context, &operands, |ordering| ordering == Ordering::Less)
        }),
        descriptor(BinaryOp::LessEqual, |context, operands| {
            compare(context, &operands, |ordering| ordering != Ordering::Greater)
        }),
        descriptor(BinaryOp::Greater, |context, operands| {
            compare(context, &operands, |ordering| ordering == Ordering::Greater)
        }),
        descriptor(BinaryOp::GreaterEqual, |context, operands| {
            compare(context, &operands, |ordering| ordering != Ordering::Less)
        }),
    ]
}

fn descriptor(op: BinaryOp, callback: fn(&mut Context<'_>, BinaryContext) -> EvalResult<Value>) -> BinaryDescriptor {
    let comparable = Type::variant(vec![Type::Numeric, Type::string(), Type::Type(None)]);
    let mut descriptor = BinaryDescriptor::new(op);
    descriptor.add(comparable.clone(), comparable, callback);
    descriptor
}

fn compare(_context: &mut Context<'_>, operands: &BinaryContext, accept: fn(Ordering) -> bool) -> EvalResult<Value> {
    let ordering = ordering_of(operands)?;
    Ok(Value::Boolean(accept(ordering)))
}

fn ordering_of(operands: &BinaryContext) -> Result<Ordering, EvaluationError> {
    match (&operands.left, &operands.right) {
        (Value::Integer(left), Value::Integer(right)) => Ok(left.cmp(right)),
        (left @ (Value::Integer(_) | Value::Float(_)), right @ (Value::Integer(_) | Value::Float(_))) => {
            let left = as_float(left);
            let right = as_float(right);
            left.partial_cmp(&right)
                .ok_or_else(|| operands.error("values are not comparable"))
        }
        (Value::String(left), Value::String(right)) => {
            Ok(left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase()))
        }
        (Value::Type(left), Value::Type(right)) => {
            if left == right {
                Ok(Ordering::Equal)
            } else if right.assignable_from(left) {
                Ok(Ordering::Less)
            } else if left.assignable_from(right) {
                Ok(Ordering::Greater)
            } else {
                Err(operands.error(format!("types {left} and {right} are not comparable")))
            }
        }
        _ => Err(operands.error("left and right operands are not comparable")),
    }
}
