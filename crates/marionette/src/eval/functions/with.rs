//! The `with` function: yields its arguments to the block and returns
//! the block's value.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("with");
    descriptor.add(
        with_block(signature(vec![Type::Any], 0, usize::MAX), 0, usize::MAX, true),
        with,
    );
    descriptor
}

fn with(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let lambda = call.lambda.expect("the dispatch signature requires a block");
    context.yield_lambda(lambda, call.args)
}
