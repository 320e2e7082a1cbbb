//! The `realize` function: materializes virtual resources by reference.

use crate::catalog::each_reference;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("realize");
    descriptor.add(signature(vec![Type::Any], 1, usize::MAX), realize);
    descriptor
}

fn realize(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    for (index, arg) in call.args.iter().enumerate() {
        let mut missing = None;
        let mut indices = Vec::new();
        each_reference(arg, &mut |reference| {
            match context.catalog.find_by_reference(&reference) {
                Some(found) => indices.push(found),
                None => {
                    if missing.is_none() {
                        missing = Some(reference.to_string());
                    }
                }
            }
        });
        if let Some(reference) = missing {
            return Err(EvaluationError::new(
                format!("resource {reference} does not exist in the catalog"),
                call.arg_span(index),
            ));
        }
        if indices.is_empty() {
            return Err(EvaluationError::new(
                format!(
                    "expected a resource reference but found {}",
                    crate::types::type_of(arg).generalize()
                ),
                call.arg_span(index),
            ));
        }
        for found in indices {
            context.catalog.realize(found);
        }
    }
    Ok(Value::Undef)
}
