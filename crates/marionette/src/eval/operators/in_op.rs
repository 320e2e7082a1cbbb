//! The membership operator.
//!
//! `x in [..]` tests element equality (or regex match for a regex left
//! operand), `x in {..}` tests key membership, and `x in 'string'` tests
//! substring (or regex) matching.

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::{INTEGER_MAX, Type};
use crate::value::Value;

pub(crate) fn create_descriptor() -> BinaryDescriptor {
    let mut descriptor = BinaryDescriptor::new(BinaryOp::In);
    descriptor.add(
        Type::Any,
        Type::Array {
            element: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        in_array,
    );
    descriptor.add(
        Type::Any,
        Type::Hash {
            key: Box::new(Type::Any),
            value: Box::new(Type::Any),
            from: 0,
            to: INTEGER_MAX,
        },
        in_hash,
    );
    descriptor.add(Type::Any, Type::string(), in_string);
    descriptor
}

fn in_array(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let Value::Array(elements) = &operands.right else {
        unreachable!("guarded by the overload types");
    };
    let found = elements.iter().any(|element| match (&operands.left, element) {
        (Value::Regex(regex), Value::String(s)) => regex.pattern().is_match(s),
        (left, element) => left.equals(element),
    });
    Ok(Value::Boolean(found))
}

fn in_hash(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let Value::Hash(hash) = &operands.right else {
        unreachable!("guarded by the overload types");
    };
    let found = hash.keys().any(|key| operands.left.equals(key));
    Ok(Value::Boolean(found))
}

fn in_string(_context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    let Value::String(subject) = &operands.right else {
        unreachable!("guarded by the overload types");
    };
    let found = match &operands.left {
        Value::String(needle) => subject.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()),
        Value::Regex(regex) => regex.pattern().is_match(subject),
        _ => false,
    };
    Ok(Value::Boolean(found))
}
