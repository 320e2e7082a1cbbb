//! The class declaration family: `include`, `require`, `contain`, and
//! `declare`.
//!
//! All four declare the named classes (evaluating each class body at most
//! once); they differ in the edges added between the declared class and
//! the resource containing the call: `require` orders the class before
//! the container, `contain` adds a containment edge, and `include` and
//! `declare` add nothing.

use crate::catalog::Relationship;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::lexer::position::Span;
use crate::types::Type;
use crate::value::Value;

pub(crate) fn create_descriptors() -> Vec<FunctionDescriptor> {
    let mut descriptors = Vec::new();
    for (name, callback) in [
        ("include", include as crate::eval::functions::FunctionCallback),
        ("declare", include),
        ("require", require),
        ("contain", contain),
    ] {
        let mut descriptor = FunctionDescriptor::new(name);
        descriptor.add(signature(vec![Type::Any], 1, usize::MAX), callback);
        descriptors.push(descriptor);
    }
    descriptors
}

/// Extracts class names from the arguments: strings, class references,
/// and arrays of either.
fn class_names(call: &CallContext<'_>) -> EvalResult<Vec<(String, Span)>> {
    let mut names = Vec::new();
    for (index, arg) in call.args.iter().enumerate() {
        collect(arg, call.arg_span(index), &mut names)?;
    }
    Ok(names)
}

fn collect(value: &Value, span: Span, names: &mut Vec<(String, Span)>) -> EvalResult<()> {
    match value {
        Value::String(name) => names.push((name.clone(), span)),
        Value::Type(Type::Class { title: Some(title) }) => names.push((title.clone(), span)),
        Value::Array(elements) => {
            for element in elements.iter() {
                collect(element, span, names)?;
            }
        }
        other => {
            return Err(EvaluationError::new(
                format!(
                    "expected String, Class, or Array for class name but found {}",
                    crate::types::type_of(other).generalize()
                ),
                span,
            ));
        }
    }
    Ok(())
}

fn include(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    for (name, span) in class_names(&call)? {
        context.declare_class(&name, span)?;
    }
    Ok(Value::Undef)
}

fn require(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let container = context.scope().borrow().resource();
    for (name, span) in class_names(&call)? {
        let declared = context.declare_class(&name, span)?;
        if let Some(container) = container {
            context.catalog.add_edge(declared, container, Relationship::Require);
        }
    }
    Ok(Value::Undef)
}

fn contain(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let container = context.scope().borrow().resource();
    for (name, span) in class_names(&call)? {
        let declared = context.declare_class(&name, span)?;
        if let Some(container) = container {
            context.catalog.add_edge(container, declared, Relationship::Contains);
        }
    }
    Ok(Value::Undef)
}
