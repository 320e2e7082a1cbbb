//! The `step` function: iterates every Nth entry, or returns a stepped
//! iterator when called without a block.

use std::rc::Rc;

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::eval::functions::each::{drive, require_iterable};
use crate::types::Type;
use crate::value::{IteratorValue, Value};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("step");
    descriptor.add(
        with_block(
            signature(vec![Type::Any, Type::Integer { from: 1, to: crate::types::INTEGER_MAX }], 2, 2),
            1,
            2,
            false,
        ),
        step,
    );
    descriptor
}

fn step(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let value = call.args[0].clone();
    require_iterable(&value, &call)?;
    let Value::Integer(count) = call.args[1] else {
        unreachable!("guarded by the dispatch signature");
    };
    let stepped = IteratorValue::stepped(value, count)
        .map_err(|error| error.with_default_span(call.arg_span(1)))?;
    let stepped = Value::Iterator(Rc::new(stepped));
    match call.lambda {
        None => Ok(stepped),
        Some(lambda) => {
            drive(context, lambda, &stepped, &mut |_context, _yielded| Ok(true))?;
            Ok(call.args[0].clone())
        }
    }
}
