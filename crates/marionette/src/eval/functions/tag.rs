//! The `tag` function: tags the containing resource.

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("tag");
    descriptor.add(
        signature(vec![Type::variant(vec![Type::string(), Type::Any])], 1, usize::MAX),
        tag,
    );
    descriptor
}

fn tag(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let Some(container) = context.scope().borrow().resource() else {
        return Err(call.error("tag() may only be called from within a resource"));
    };
    for (index, arg) in call.args.iter().enumerate() {
        for element in arg.clone().into_elements(false) {
            match element {
                Value::String(name) => context.catalog.get_mut(container).tag(&name),
                other => {
                    return Err(EvaluationError::new(
                        format!(
                            "expected String for tag but found {}",
                            crate::types::type_of(&other).generalize()
                        ),
                        call.arg_span(index),
                    ));
                }
            }
        }
    }
    Ok(Value::Undef)
}
