//! The shift operators. `<<` also appends to arrays.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::{INTEGER_MAX, Type};
use crate::value::Value;

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::LeftShift);
    descriptor.add(Type::integer(), Type::integer(), shift_left);
    descriptor.add(
        Type::Array {
            element: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        Type::Any,
        array_append,
    );
    descriptor
}

pub(crate) fn create_right_shift_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::RightShift);
    descriptor.add(Type::integer(), Type::integer(), shift_right);
    descriptor
}

/// A negative shift count reverses direction.
fn shift_left(context: &mut Context<'_>, mut operands: BinaryContext) -> EvalResult<Value> {
    if let Value::Integer(count) = operands.right {
        if count < 0 {
            operands.right = Value::Integer(count.checked_neg().ok_or_else(|| {
                operands.error("shift count results in an arithmetic overflow".to_owned())
            })?);
            return shift_right(context, operands);
        }
    }
    let (Value::Integer(left), Value::Integer(right)) = (&operands.left, &operands.right) else {
        unreachable!("guarded by the overload types");
    };
    let count = u32::try_from(*right).ok().filter(|count| *count < 64);
    let shifted = count.and_then(|count| left.checked_shl(count)).filter(|shifted| {
        // checked_shl only guards the count; reject bit loss too
        shifted >> right.min(&63) == *left
    });
    match shifted {
        Some(shifted) => Ok(Value::Integer(shifted)),
        None => Err(operands.error(format!(
            "left shift of {left} by {right} results in an arithmetic overflow"
        ))),
    }
}

fn shift_right(context: &mut Context<'_>, mut operands: BinaryContext) -> EvalResult<Value> {
    if let Value::Integer(count) = operands.right {
        if count < 0 {
            operands.right = Value::Integer(count.checked_neg().ok_or_else(|| {
                operands.error("shift count results in an arithmetic overflow".to_owned())
            })?);
            return shift_left(context, operands);
        }
    }
    let (Value::Integer(left), Value::Integer(right)) = (&operands.left, &operands.right) else {
        unreachable!("guarded by the overload types");
    };
    match u32::try_from(*right).ok().and_then(|count| left.checked_shr(count)) {
        Some(shifted) => Ok(Value::Integer(shifted)),
        None => Ok(Value::Integer(if *left < 0 { -1 } else { 0 })),
    }
}

/// `[1, 2] << 3` appends as a single element (unlike `+`, a hash or array
/// on the right is appended whole).
fn array_append(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let mut elements = operands.left.into_elements(false);
    elements.push(operands.right);
    Ok(Value::array(elements))
}
