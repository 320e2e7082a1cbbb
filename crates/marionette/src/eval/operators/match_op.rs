//! The match operators.
//!
//! `=~` matches a string against a regex (or a string compiled as one),
//! populating the current match scope on success, or tests any value
//! against a type. `!~` is the negation and does not populate captures.

use smallvec::SmallVec;

use crate::ast::BinaryOp;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor};
use crate::types::Type;
use crate::value::{Value, ValueRegex};

pub(crate) fn create_descriptors() -> Vec<BinaryDescriptor> {
    let pattern = Type::variant(vec![Type::string(), Type::Regexp]);

    let mut matches = BinaryDescriptor::new(BinaryOp::Match);
    matches.add(Type::string(), pattern.clone(), |context, operands| {
        regex_match(context, &operands, false)
    });
    matches.add(Type::Any, Type::Type(None), |_, operands| {
        Ok(Value::Boolean(type_match(&operands)))
    });

    let mut not_matches = BinaryDescriptor::new(BinaryOp::NotMatch);
    not_matches.add(Type::string(), pattern, |context, operands| {
        regex_match(context, &operands, true)
    });
    not_matches.add(Type::Any, Type::Type(None), |_, operands| {
        Ok(Value::Boolean(!type_match(&operands)))
    });

    vec![matches, not_matches]
}

fn type_match(operands: &BinaryContext) -> bool {
    match &operands.right {
        Value::Type(t) => t.instance_of(&operands.left),
        _ => false,
    }
}

fn regex_match(context: &mut Context<'_>, operands: &BinaryContext, negate: bool) -> EvalResult<Value> {
    let Value::String(subject) = &operands.left else {
        unreachable!("guarded by the overload types");
    };
    let compiled;
    let regex = match &operands.right {
        Value::Regex(regex) => regex,
        Value::String(pattern) => {
            compiled = ValueRegex::new(pattern.clone())
                .map_err(|error| operands.error(format!("invalid regular expression: {error}")))?;
            &compiled
        }
        _ => unreachable!("guarded by the overload types"),
    };

    match regex.pattern().captures(subject) {
        Some(captures) => {
            if !negate {
                let groups: SmallVec<[Option<String>; 4]> = captures
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_owned()))
                    .collect();
                context.match_scopes.set(groups);
            }
            Ok(Value::Boolean(!negate))
        }
        None => Ok(Value::Boolean(negate)),
    }
}
