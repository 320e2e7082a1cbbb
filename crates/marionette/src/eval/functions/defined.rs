//! The `defined` function: existence checks over variables, definitions,
//! and declared resources.
//!
//! A `$`-prefixed string tests variable bindings; a plain string tests
//! whether a class or defined type of that name exists; a reference type
//! with a title tests the catalog; a reference type without a title tests
//! the registry. With several arguments, all must be defined.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("defined");
    descriptor.add(
        signature(
            vec![Type::variant(vec![Type::string(), Type::Type(None)])],
            1,
            usize::MAX,
        ),
        defined,
    );
    descriptor
}

fn defined(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    for arg in &call.args {
        if !is_defined(context, arg) {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn is_defined(context: &Context<'_>, value: &Value) -> bool {
    match value {
        Value::String(text) => match text.strip_prefix('$') {
            Some(variable) => context.lookup(variable).is_some(),
            None => {
                context.registry.find_class(text).is_some() || context.registry.find_defined_type(text).is_some()
            }
        },
        Value::Type(Type::Class { title }) => match title {
            Some(title) => {
                context.catalog.find("Class", title).is_some() || context.registry.find_class(title).is_some()
            }
            None => false,
        },
        Value::Type(Type::Resource { type_name, title }) => match (type_name, title) {
            (Some(type_name), Some(title)) => context.catalog.find(type_name, title).is_some(),
            (Some(type_name), None) => context.registry.find_defined_type(type_name).is_some(),
            _ => false,
        },
        _ => false,
    }
}
