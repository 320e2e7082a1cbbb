//! The `assert_type` function.
//!
//! `assert_type(T, value)` returns the value when it is an instance of
//! the type. On mismatch, an optional two-parameter block receives the
//! expected and actual types and its result becomes the call's value;
//! without a block the mismatch is an error.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::types::{Type, parse as type_parse, type_of};
use crate::value::Value;

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("assert_type");
    descriptor.add(
        with_block(
            signature(
                vec![Type::variant(vec![Type::Type(None), Type::string()]), Type::Any],
                2,
                2,
            ),
            2,
            2,
            false,
        ),
        assert_type,
    );
    descriptor
}

fn assert_type(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let expected = match &call.args[0] {
        Value::Type(t) => t.clone(),
        Value::String(source) => parse_type_string(context, source).map_err(|message| {
            crate::error::EvaluationError::new(message, call.arg_span(0))
        })?,
        _ => unreachable!("guarded by the dispatch signature"),
    };
    let value = call.args[1].clone();

    if expected.instance_of(&value) {
        return Ok(value);
    }

    let actual = type_of(&value).generalize();
    match call.lambda {
        Some(lambda) => context.yield_lambda(lambda, vec![Value::Type(expected), Value::Type(actual)]),
        None => Err(crate::error::EvaluationError::new(
            format!("expected a value of type {expected} but found {actual}"),
            call.arg_span(1),
        )),
    }
}

/// Parses a type from its string form by parsing and evaluating it as a
/// type expression.
fn parse_type_string(context: &Context<'_>, source: &str) -> Result<Type, String> {
    let output =
        crate::parser::parse(&format!("type X = {source}"), "<assert_type>").map_err(|error| error.to_string())?;
    let crate::ast::Statement::TypeAlias(alias) = &output.tree.statements[0] else {
        return Err(format!("'{source}' is not a valid type specification"));
    };
    let resolver = context.alias_resolver();
    type_parse::type_from_expression(&alias.aliased, &resolver).map_err(|error| error.message.into_owned())
}
