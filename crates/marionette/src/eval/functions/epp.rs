//! The EPP template functions.
//!
//! `inline_epp` renders template source given as a string; `epp` reads
//! the template from a file first. Rendering evaluates the template's
//! statements in an isolated scope parented at top: render-string parts
//! concatenate and render-expression parts stringify. An optional hash
//! argument supplies the template's parameters.

use std::fs;
use std::rc::Rc;

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::eval::functions::file::resolve_path;
use crate::eval::scope::Scope;
use crate::lexer::position::Span;
use crate::parser;
use crate::types::{INTEGER_MAX, Type};
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("epp");
    descriptor.add(
        signature(vec![Type::string(), parameters_type()], 1, 2),
        epp,
    );
    descriptor
}

pub(crate) fn create_inline_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("inline_epp");
    descriptor.add(
        signature(vec![Type::string(), parameters_type()], 1, 2),
        inline_epp,
    );
    descriptor
}

fn parameters_type() -> Type {
    Type::Optional(Some(Box::new(Type::Hash {
        key: Box::new(Type::string()),
        value: Box::new(Type::Any),
        from: 0,
        to: INTEGER_MAX,
    })))
}

fn epp(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let Value::String(path) = &call.args[0] else {
        unreachable!("guarded by the dispatch signature");
    };
    let resolved = resolve_path(context, path);
    let source = fs::read_to_string(&resolved).map_err(|error| {
        EvaluationError::new(
            format!("cannot read template file '{}': {error}", resolved.display()),
            call.arg_span(0),
        )
    })?;
    render(context, &source, &resolved.display().to_string(), &call)
}

fn inline_epp(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let Value::String(source) = &call.args[0] else {
        unreachable!("guarded by the dispatch signature");
    };
    let source = source.clone();
    render(context, &source, "<epp>", &call)
}

fn render(context: &mut Context<'_>, source: &str, path: &str, call: &CallContext<'_>) -> EvalResult<Value> {
    let output = parser::parse_epp(source, path)
        .map_err(|error| EvaluationError::new(format!("template parse failure: {error}"), call.call_span))?;
    context.log_source_warnings(&output.warnings);

    let tree = Rc::new(output.tree);
    let scope = Scope::top(context.facts());

    // Bind declared (or free-form) template parameters from the hash
    let given = call.args.get(1).and_then(Value::as_hash).cloned();
    if let Some(given) = &given {
        match &output.parameters {
            Some(declared) => {
                for parameter in declared {
                    let value = given
                        .get(&Value::string(parameter.name.clone()))
                        .cloned();
                    let value = match value {
                        Some(value) => value,
                        None => match &parameter.default {
                            Some(default) => context.evaluate(default)?,
                            None => {
                                return Err(EvaluationError::new(
                                    format!("template parameter '${}' is required", parameter.name),
                                    call.arg_span(1),
                                ));
                            }
                        },
                    };
                    scope
                        .borrow_mut()
                        .set(parameter.name.clone(), value, parameter.name_span)
                        .ok();
                }
                for key in given.keys() {
                    let name = key.as_string().unwrap_or_default();
                    if !declared.iter().any(|parameter| parameter.name == name) {
                        return Err(EvaluationError::new(
                            format!("'{name}' is not a parameter of the template"),
                            call.arg_span(1),
                        ));
                    }
                }
            }
            None => {
                for (key, value) in given.iter() {
                    if let Some(name) = key.as_string() {
                        scope.borrow_mut().set(name.to_owned(), value.clone(), Span::default()).ok();
                    }
                }
            }
        }
    } else if let Some(declared) = &output.parameters {
        for parameter in declared {
            let value = match &parameter.default {
                Some(default) => context.evaluate(default)?,
                None => {
                    return Err(EvaluationError::new(
                        format!("template parameter '${}' is required", parameter.name),
                        call.call_span,
                    ));
                }
            };
            scope
                .borrow_mut()
                .set(parameter.name.clone(), value, parameter.name_span)
                .ok();
        }
    }

    context.with_tree(tree.clone(), |context| {
        context.with_scope(scope, |context| context.render_template(&tree.statements))
    })
}
