//! The `fail` function: aborts evaluation with the given message.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::eval::functions::log::format_message;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("fail");
    descriptor.add(signature(vec![Type::Any], 0, usize::MAX), fail);
    descriptor
}

fn fail(_context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    Err(call.error(format!("evaluation failed: {}", format_message(&call))))
}
