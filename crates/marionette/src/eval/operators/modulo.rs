//! The modulo operator. Defined on integers only.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::Modulo);
    descriptor.add(Type::integer(), Type::integer(), modulo);
    descriptor
}

fn modulo(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let (Value::Integer(left), Value::Integer(right)) = (&operands.left, &operands.right) else {
        unreachable!("guarded by the overload types");
    };
    if *right == 0 {
        return Err(operands.error("cannot divide by zero"));
    }
    match left.checked_rem(*right) {
        Some(remainder) => Ok(Value::Integer(remainder)),
        None => Err(operands.error(format!(
            "modulo of {left} by {right} results in an arithmetic overflow"
        ))),
    }
}
