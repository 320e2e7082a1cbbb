//! The `filter` function: selects the entries for which the block is
//! truthy. Hash sources produce a hash; everything else produces an
//! array.

use crate::error::EvalResult;
use crate::eval::context::{CallContext, Context};
use crate::eval::functions::FunctionDescriptor;
use crate::eval::functions::descriptor::{signature, with_block};
use crate::eval::functions::each::require_iterable;
use crate::types::Type;
use crate::value::{Value, ValueHash, iterator};

pub(crate) fn create_descriptor() -> FunctionDescriptor {
    let mut descriptor = FunctionDescriptor::new("filter");
    descriptor.add(with_block(signature(vec![Type::Any], 1, 1), 1, 2, true), filter);
    descriptor
}

fn filter(context: &mut Context<'_>, call: CallContext<'_>) -> EvalResult<Value> {
    let lambda = call.lambda.expect("the dispatch signature requires a block");
    let value = call.args[0].clone();
    require_iterable(&value, &call)?;

    let hash_source = matches!(&value, Value::Hash(_))
        || matches!(&value, Value::Iterator(it) if matches!(it.source(), Value::Hash(_)));
    let arity = lambda.parameters.len();

    let mut kept_array = Vec::new();
    let mut kept_hash = ValueHash::default();
    iterator::each_entry(&value, &mut |key, entry| {
        let args = if arity == 1 {
            if hash_source {
                vec![Value::array(vec![key.clone(), entry.clone()])]
            } else {
                vec![entry.clone()]
            }
        } else {
            vec![key.clone(), entry.clone()]
        };
        match context.yield_lambda(lambda, args) {
            Ok(yielded) => {
                if yielded.is_truthy() {
                    if hash_source {
                        kept_hash.insert(key, entry);
                    } else {
                        kept_array.push(entry);
                    }
                }
                Ok(true)
            }
            Err(error) if error.control_break => Ok(false),
            Err(error) => Err(error),
        }
    })?;

    if hash_source {
        Ok(Value::hash(kept_hash))
    } else {
        Ok(Value::array(kept_array))
    }
}
