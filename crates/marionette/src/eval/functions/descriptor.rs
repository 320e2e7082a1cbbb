//! Function descriptors: signature-typed overload resolution.
//!
//! A descriptor holds one or more dispatch signatures, each a
//! [`CallableType`] plus a callback. Dispatch tries signatures in
//! registration order and invokes the first that accepts the call. When
//! every signature rejects, the error reports the first mismatch of the
//! primary signature in priority order: argument count, block presence,
//! block arity, then parameter type.

use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::{CallContext, Context};
use crate::types::{CallableType, Type, type_of};
use crate::value::Value;

/// A builtin (or bridged) function implementation.
pub type FunctionCallback = fn(&mut Context<'_>, CallContext<'_>) -> EvalResult<Value>;

/// One dispatchable signature.
pub struct DispatchSignature {
    pub callable: CallableType,
    pub callback: FunctionCallback,
}

/// Why a signature rejected a call, ordered by reporting priority.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mismatch {
    Count,
    BlockUnexpected,
    BlockMissing,
    BlockArity,
    Parameter { index: usize, expected: Type },
}

/// A named function with its dispatch signatures.
pub struct FunctionDescriptor {
    name: String,
    signatures: Vec<DispatchSignature>,
}

impl FunctionDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signatures: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a dispatch signature; order is significant.
    pub fn add(&mut self, callable: CallableType, callback: FunctionCallback) {
        self.signatures.push(DispatchSignature { callable, callback });
    }

    /// Dispatches a call to the first accepting signature.
    pub fn dispatch(&self, context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
        for signature in &self.signatures {
            if check(&signature.callable, &call).is_ok() {
                return (signature.callback)(context, call);
            }
        }
        let primary = self
            .signatures
            .first()
            .expect("descriptors are registered with at least one signature");
        let mismatch = check(&primary.callable, &call).expect_err("dispatch failed, so the check must too");
        Err(self.mismatch_error(&primary.callable, &mismatch, &call))
    }

    fn mismatch_error(&self, callable: &CallableType, mismatch: &Mismatch, call: &CallContext<'_>) -> EvaluationError {
        let name = &self.name;
        match mismatch {
            Mismatch::Count => {
                let given = call.args.len();
                let message = if callable.max == usize::MAX {
                    format!(
                        "function '{name}' expects at least {} but was given {given}",
                        count_phrase(callable.min)
                    )
                } else if callable.min == callable.max {
                    format!(
                        "function '{name}' expects {} but was given {given}",
                        count_phrase(callable.min)
                    )
                } else {
                    format!(
                        "function '{name}' expects between {} and {} arguments but was given {given}",
                        callable.min, callable.max
                    )
                };
                EvaluationError::new(message, call.call_span)
            }
            Mismatch::BlockUnexpected => EvaluationError::new(
                format!("function '{name}' does not accept a block"),
                call.lambda.map_or(call.call_span, |lambda| lambda.span),
            ),
            Mismatch::BlockMissing => {
                EvaluationError::new(format!("function '{name}' requires a block"), call.call_span)
            }
            Mismatch::BlockArity => {
                let (block_min, block_max) = block_arity(callable);
                let message = if block_min == block_max {
                    format!(
                        "the block passed to function '{name}' expects {}",
                        count_phrase(block_min)
                    )
                } else {
                    format!(
                        "the block passed to function '{name}' expects between {block_min} and {block_max} arguments"
                    )
                };
                EvaluationError::new(message, call.lambda.map_or(call.call_span, |lambda| lambda.span))
            }
            Mismatch::Parameter { index, expected } => EvaluationError::new(
                format!(
                    "function '{name}' expects {expected} for the {} argument but was given {}",
                    ordinal(*index),
                    type_of(&call.args[*index]).generalize()
                ),
                call.arg_span(*index),
            ),
        }
    }
}

fn count_phrase(count: usize) -> String {
    if count == 1 {
        "1 argument".to_owned()
    } else {
        format!("{count} arguments")
    }
}

fn ordinal(index: usize) -> String {
    match index {
        0 => "first".to_owned(),
        1 => "second".to_owned(),
        2 => "third".to_owned(),
        n => format!("{}th", n + 1),
    }
}

fn block_arity(callable: &CallableType) -> (usize, usize) {
    match callable.block.as_deref() {
        Some(Type::Callable(block)) => (block.min, block.max),
        _ => (0, usize::MAX),
    }
}

/// Checks a call against one signature, reporting the first mismatch in
/// priority order.
fn check(callable: &CallableType, call: &CallContext<'_>) -> Result<(), Mismatch> {
    if call.args.len() < callable.min || call.args.len() > callable.max {
        return Err(Mismatch::Count);
    }
    match (&callable.block, call.lambda) {
        (None, Some(_)) => return Err(Mismatch::BlockUnexpected),
        (Some(_), None) => {
            if callable.block_required {
                return Err(Mismatch::BlockMissing);
            }
        }
        (Some(_), Some(lambda)) => {
            let (block_min, block_max) = block_arity(callable);
            let required = lambda
                .parameters
                .iter()
                .filter(|parameter| parameter.default.is_none() && !parameter.captures_rest)
                .count();
            let accepted = if lambda.parameters.iter().any(|parameter| parameter.captures_rest) {
                usize::MAX
            } else {
                lambda.parameters.len()
            };
            if required > block_max || accepted < block_min {
                return Err(Mismatch::BlockArity);
            }
        }
        (None, None) => {}
    }
    for (index, arg) in call.args.iter().enumerate() {
        let Some(expected) = callable.params.get(index).or_else(|| callable.params.last()) else {
            continue;
        };
        if !expected.instance_of(arg) {
            return Err(Mismatch::Parameter {
                index,
                expected: expected.clone(),
            });
        }
    }
    Ok(())
}

/// Builds a callable signature: parameter types, count range, and an
/// optional block with the given yield-arity range.
#[must_use]
pub fn signature(params: Vec<Type>, min: usize, max: usize) -> CallableType {
    CallableType {
        params,
        min,
        max,
        block: None,
        block_required: false,
    }
}

/// Adds a block to a signature; `required` selects between a mandatory
/// and an optional block.
#[must_use]
pub fn with_block(mut callable: CallableType, yield_min: usize, yield_max: usize, required: bool) -> CallableType {
    callable.block = Some(Box::new(Type::Callable(CallableType {
        params: Vec::new(),
        min: yield_min,
        max: yield_max,
        block: None,
        block_required: false,
    })));
    callable.block_required = required;
    callable
}
