//! The `split` function, with string and regex overloads.

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::signature;
use crate::lexer::position::Span;
use crate::types::Type;
use crate::value::{Value, ValueRegex};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("split");
    descriptor.add(
        signature(
            vec![
                Type::string(),
                Type::variant(vec![Type::string(), Type::Regexp]),
            ],
            2,
            2,
        ),
        split,
    );
    descriptor
}

fn split(_context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let Value::String(subject) = &call.args[0] else {
        unreachable!("guarded by the dispatch signature");
    };

    let pieces: Vec<Value> = match &call.args[1] {
        // A string separator is compiled as a regex, matching the language
        Value::String(pattern) => {
            let regex = compile(pattern, call.arg_span(1))?;
            split_with(subject, &regex)
        }
        Value::Regex(regex) => split_with(subject, regex),
        _ => unreachable!("guarded by the dispatch signature"),
    };
    Ok(Value::array(pieces))
}

fn compile(pattern: &str, span: Span) -> Result<ValueRegex, EvaluationError> {
    ValueRegex::new(pattern.to_owned())
        .map_err(|error| EvaluationError::new(format!("invalid regular expression: {error}"), span))
}

fn split_with(subject: &str, regex: &ValueRegex) -> Vec<Value> {
    regex
        .pattern()
        .split(subject)
        .map(|piece| Value::string(piece.to_owned()))
        .collect()
}
