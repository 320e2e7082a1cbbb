//! The multiplication operator.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::plus::as_float;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::Multiply);
    descriptor.add(Type::Numeric, Type::Numeric, multiply);
    descriptor
}

fn multiply(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    match (&operands.left, &operands.right) {
        (Value::Integer(left), Value::Integer(right)) => match left.checked_mul(*right) {
            Some(product) => Ok(Value::Integer(product)),
            None => Err(operands.error(format!(
                "multiplication of {left} and {right} results in an arithmetic overflow"
            ))),
        },
        (left, right) => {
            let left = as_float(left);
            let right = as_float(right);
            let product = left * right;
            if product.is_finite() || left.is_infinite() || right.is_infinite() {
                Ok(Value::Float(product))
            } else {
                Err(operands.error(format!(
                    "multiplication of {left} and {right} results in an arithmetic overflow"
                )))
            }
        }
    }
}
