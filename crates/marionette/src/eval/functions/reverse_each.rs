//! The `reverse_each` function: iterates in reverse order, or returns a
//! reversed iterator when called without a block.

use std::rc::Rc;

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::eval::functions::each::{drive, require_iterable};
use crate::types::Type;
use crate::value::{IteratorValue, Value};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("reverse_each");
    descriptor.add(with_block(signature(vec![Type::Any], 1, 1), 1, 2, false), reverse_each);
    descriptor
}

fn reverse_each(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let value = call.args[0].clone();
    require_iterable(&value, &call)?;
    let reversed = Value::Iterator(Rc::new(IteratorValue::reversed(value)));
    match call.lambda {
        None => Ok(reversed),
        Some(lambda) => {
            drive(context, lambda, &reversed, &mut |_context, _yielded| Ok(true))?;
            Ok(call.args[0].clone())
        }
    }
}
