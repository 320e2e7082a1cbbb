//! The division operator.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::plus::as_float;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::Divide);
    descriptor.add(Type::Numeric, Type::Numeric, divide);
    descriptor
}

fn divide(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    match (&operands.left, &operands.right) {
        (Value::Integer(left), Value::Integer(right)) => {
            if *right == 0 {
                return Err(operands.error("cannot divide by zero"));
            }
            match left.checked_div(*right) {
                Some(quotient) => Ok(Value::Integer(quotient)),
                None => Err(operands.error(format!(
                    "division of {left} by {right} results in an arithmetic overflow"
                ))),
            }
        }
        (left, right) => {
            let left = as_float(left);
            let right = as_float(right);
            if right == 0.0 {
                return Err(operands.error("cannot divide by zero"));
            }
            let quotient = left / right;
            if quotient.is_finite() || left.is_infinite() {
                Ok(Value::Float(quotient))
            } else {
                Err(operands.error(format!(
                    "division of {left} by {right} results in an arithmetic overflow"
                )))
            }
        }
    }
}
