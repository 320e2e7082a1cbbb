//! The `map` function: transforms each entry through the block.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::eval::functions::each::{drive, require_iterable};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("map");
    descriptor.add(with_block(signature(vec![Type::Any], 1, 1), 1, 2, true), map);
    descriptor
}

fn map(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let lambda = call.lambda.expect("the dispatch signature requires a block");
    let value = call.args[0].clone();
    require_iterable(&value, &call)?;
    let mut mapped = Vec::new();
    drive(context, lambda, &value, &mut |_context, yielded| {
        mapped.push(yielded);
        Ok(true)
    })?;
    Ok(Value::array(mapped))
}
