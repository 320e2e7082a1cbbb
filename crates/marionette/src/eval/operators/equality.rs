//! The equality operators, defined over any pair of values.
//!
//! Equality semantics live on [`Value::equals`]: numbers compare across
//! integer/float, strings compare case-insensitively.

use crate::ast::BinaryOp;
use crate::eval::operators::BinaryDescriptor;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptors() -> Vec<BinaryDescriptor> {
    let mut equals = BinaryDescriptor::new(BinaryOp::Equals);
    equals.add(Type::Any, Type::Any, |_, operands| {
        Ok(Value::Boolean(operands.left.equals(&operands.right)))
    });
    let mut not_equals = BinaryDescriptor::new(BinaryOp::NotEquals);
    not_equals.add(Type::Any, Type::Any, |_, operands| {
        Ok(Value::Boolean(!operands.left.equals(&operands.right)))
    });
    vec![equals, not_equals]
}
