//! The `reduce` function: folds entries through a two-parameter block.
//!
//! With no seed, the first entry becomes the initial memo. A `break`
//! inside the block stops the fold and the memo at that point is the
//! result.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::eval::functions::each::require_iterable;
use crate::types::Type;
use crate::value::{Value, iterator};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("reduce");
    descriptor.add(
        with_block(signature(vec![Type::Any, Type::Any], 1, 2), 2, 2, true),
        reduce,
    );
    descriptor
}

fn reduce(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let lambda = call.lambda.expect("the dispatch signature requires a block");
    let (value, mut memo) = if call.args.len() == 2 {
        (call.args[0].clone(), Some(call.args[1].clone()))
    } else {
        (call.args[0].clone(), None)
    };
    require_iterable(&value, &call)?;

    let hash_source = matches!(&value, Value::Hash(_))
        || matches!(&value, Value::Iterator(it) if matches!(it.source(), Value::Hash(_)));

    iterator::each_entry(&value, &mut |key, entry| {
        let entry = if hash_source {
            Value::array(vec![key, entry])
        } else {
            entry
        };
        let Some(current) = memo.take() else {
            memo = Some(entry);
            return Ok(true);
        };
        match context.yield_lambda(lambda, vec![current.clone(), entry]) {
            Ok(yielded) => {
                memo = Some(yielded);
                Ok(true)
            }
            // A break keeps the memo from before the interrupted call
            Err(error) if error.control_break => {
                memo = Some(current);
                Ok(false)
            }
            Err(error) => Err(error),
        }
    })?;
    Ok(memo.unwrap_or(Value::Undef))
}
