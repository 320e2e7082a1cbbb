//! The `tagged` function: tests the containing resource's tag set.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("tagged");
    descriptor.add(signature(vec![Type::string()], 1, usize::MAX), tagged);
    descriptor
}

fn tagged(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let Some(container) = context.scope().borrow().resource() else {
        return Ok(Value::Boolean(false));
    };
    let tags = context.catalog.get(container).calculate_tags(&context.catalog);
    for arg in &call.args {
        let Value::String(name) = arg else {
            unreachable!("guarded by the dispatch signature");
        };
        if !tags.contains(&name.to_ascii_lowercase()) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}
