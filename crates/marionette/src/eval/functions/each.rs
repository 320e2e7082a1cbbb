//! The `each` function and the shared yield driver for the iteration
//! family.
//!
//! The yield contract: a one-parameter block receives hash entries as
//! `[key, value]` arrays and other entries as the value alone; a
//! two-parameter block receives `(key, value)` for hashes and
//! `(index, value)` for ordered collections. A `break` raised inside the
//! block stops iteration and each driver supplies its own result for the
//! interrupted call.

use crate::ast::Lambda;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::types::Type;
use crate::value::{Value, iterator};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("each");
    descriptor.add(with_block(signature(vec![Type::Any], 1, 1), 1, 2, true), each);
    descriptor
}

fn each(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let lambda = call.lambda.expect("the dispatch signature requires a block");
    let value = call.args[0].clone();
    require_iterable(&value, &call)?;
    drive(context, lambda, &value, &mut |_context, _yielded| Ok(true))?;
    Ok(value)
}

/// Fails with the not-iterable message unless iteration over the value is
/// defined.
pub(crate) fn require_iterable(value: &Value, call: &CallContext<'_>) -> EvalResult<()> {
    if iterator::is_iterable(value) {
        return Ok(());
    }
    Err(EvaluationError::new(
        format!(
            "values of type {} cannot be iterated",
            crate::types::type_of(value).generalize()
        ),
        call.arg_span(0),
    ))
}

/// True when entries should yield as key/value pairs.
fn is_hash_like(value: &Value) -> bool {
    match value {
        Value::Hash(_) => true,
        Value::Iterator(iterator) => matches!(iterator.source(), Value::Hash(_)),
        _ => false,
    }
}

/// Runs the block over every entry of `value`, passing each yield result
/// to `visit` (which returns false to stop). A `break` from the block
/// stops iteration silently; other errors propagate.
pub(crate) fn drive(
    context: &mut Context<'_>,
    lambda: &Lambda,
    value: &Value,
    visit: &mut dyn FnMut(&mut Context<'_>, Value) -> EvalResult<bool>,
) -> EvalResult<()> {
    let pairs = is_hash_like(value);
    let arity = lambda.parameters.len();
    iterator::each_entry(value, &mut |key, entry| {
        let args = if arity == 1 {
            if pairs {
                vec![Value::array(vec![key, entry])]
            } else {
                vec![entry]
            }
        } else {
            vec![key, entry]
        };
        match context.yield_lambda(lambda, args) {
            Ok(yielded) => visit(context, yielded),
            Err(error) if error.control_break => Ok(false),
            Err(error) => Err(error),
        }
    })?;
    Ok(())
}
